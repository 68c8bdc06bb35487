// src/api/tools.rs

//! Unauthenticated helper routes.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};

use super::ApiQuery;
use crate::app::AppContext;
use crate::error::Result;
use crate::services::cgpa::convert_cgpa;
use crate::services::currency::Conversion;

pub async fn health(State(ctx): State<Arc<AppContext>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "ai": ctx.generator().is_some(),
        "places": ctx.places.is_some(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CurrencyQuery {
    amount: f64,
    from: String,
    to: String,
}

pub async fn convert_currency(
    State(ctx): State<Arc<AppContext>>,
    ApiQuery(query): ApiQuery<CurrencyQuery>,
) -> Result<Json<Conversion>> {
    Ok(Json(
        ctx.currency
            .convert(query.amount, &query.from, &query.to)
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct CgpaQuery {
    value: f64,
}

pub async fn convert_cgpa_value(ApiQuery(query): ApiQuery<CgpaQuery>) -> Result<Json<Value>> {
    let converted = convert_cgpa(query.value)?;
    Ok(Json(json!({
        "value": query.value,
        "converted": converted,
        "scale": 10,
    })))
}
