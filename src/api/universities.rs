// src/api/universities.rs

//! University catalogue routes.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{AdminUser, ApiJson, ApiPath, ApiQuery, optional_json};
use crate::app::AppContext;
use crate::error::Result;
use crate::models::UniversityRecord;
use crate::services::universities::{Page, UniversityInput};
use crate::services::UniversityQuery;

pub async fn list(
    State(ctx): State<Arc<AppContext>>,
    ApiQuery(query): ApiQuery<UniversityQuery>,
) -> Result<Json<Page<UniversityRecord>>> {
    Ok(Json(ctx.universities.search(&query).await?))
}

pub async fn get(
    State(ctx): State<Arc<AppContext>>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<UniversityRecord>> {
    Ok(Json(ctx.universities.get(&id).await?))
}

pub async fn create(
    State(ctx): State<Arc<AppContext>>,
    AdminUser(admin): AdminUser,
    ApiJson(input): ApiJson<UniversityInput>,
) -> Result<(StatusCode, Json<UniversityRecord>)> {
    let record = ctx.universities.create(input).await?;
    log::info!("{} created university {} ({})", admin.email, record.name, record.id);
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update(
    State(ctx): State<Arc<AppContext>>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(input): ApiJson<UniversityInput>,
) -> Result<Json<UniversityRecord>> {
    let record = ctx.universities.update(&id, input).await?;
    log::info!("{} updated university {}", admin.email, id);
    Ok(Json(record))
}

pub async fn delete(
    State(ctx): State<Arc<AppContext>>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<Value>> {
    ctx.universities.delete(&id).await?;
    log::info!("{} deleted university {}", admin.email, id);
    Ok(Json(json!({ "deleted": id })))
}

#[derive(Debug, Deserialize)]
pub struct VerifyBody {
    #[serde(default = "verified_default")]
    verified: bool,
}

impl Default for VerifyBody {
    fn default() -> Self {
        Self {
            verified: verified_default(),
        }
    }
}

fn verified_default() -> bool {
    true
}

/// Body is optional; an empty body verifies.
pub async fn verify(
    State(ctx): State<Arc<AppContext>>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<String>,
    body: Bytes,
) -> Result<Json<UniversityRecord>> {
    let body: VerifyBody = optional_json(&body)?;
    let record = ctx.universities.set_verified(&id, body.verified).await?;
    log::info!(
        "{} set verified={} on university {}",
        admin.email,
        body.verified,
        id
    );
    Ok(Json(record))
}
