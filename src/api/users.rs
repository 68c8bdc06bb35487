// src/api/users.rs

//! Account, profile and saved pathway routes.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{ApiJson, ApiPath, optional_json};
use crate::app::AppContext;
use crate::error::Result;
use crate::models::{Feature, PathwayProfile, PlanLimits, SubscriptionUsage, UserPathway, UserProfile};
use crate::services::usage::{evaluate, view_for_plan};
use crate::services::user_pathways::SavedPathway;
use crate::services::{AuthUser, Gate, ProfileUpdate, StepUpdate};

#[derive(Debug, Default, Deserialize)]
pub struct RegisterBody {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Account {
    user: AuthUser,
    profile: Option<UserProfile>,
}

/// Create the caller's profile. 201 on creation, 200 when it already exists.
pub async fn register(
    State(ctx): State<Arc<AppContext>>,
    user: AuthUser,
    body: Bytes,
) -> Result<(StatusCode, Json<Account>)> {
    let body: RegisterBody = optional_json(&body)?;
    let (profile, created) = ctx.profiles.register(&user, body.display_name).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(Account {
            user,
            profile: Some(profile),
        }),
    ))
}

pub async fn me(State(ctx): State<Arc<AppContext>>, user: AuthUser) -> Result<Json<Account>> {
    let profile = ctx.db.profile(&user.uid).await?;
    Ok(Json(Account { user, profile }))
}

pub async fn get_profile(
    State(ctx): State<Arc<AppContext>>,
    user: AuthUser,
) -> Result<Json<UserProfile>> {
    Ok(Json(ctx.profiles.get(&user.uid).await?))
}

pub async fn update_profile(
    State(ctx): State<Arc<AppContext>>,
    user: AuthUser,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> Result<Json<UserProfile>> {
    Ok(Json(ctx.profiles.update(&user.uid, update).await?))
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    profile: UserProfile,
    pathways: Vec<UserPathway>,
    usage: SubscriptionUsage,
    limits: PlanLimits,
    pathway_generation: Gate,
    detailed_analysis: Gate,
}

pub async fn dashboard(
    State(ctx): State<Arc<AppContext>>,
    user: AuthUser,
) -> Result<Json<Dashboard>> {
    let usage = ctx.usage.usage(&user.uid).await?;
    let (profile, pathways) = tokio::try_join!(
        ctx.profiles.get(&user.uid),
        ctx.user_pathways.list(&user.uid, usage.plan),
    )?;

    let now = Utc::now();
    Ok(Json(Dashboard {
        pathway_generation: evaluate(&usage, Feature::PathwayGeneration, now),
        detailed_analysis: evaluate(&usage, Feature::DetailedAnalysis, now),
        limits: usage.plan.limits(),
        profile,
        pathways,
        usage,
    }))
}

pub async fn list_pathways(
    State(ctx): State<Arc<AppContext>>,
    user: AuthUser,
) -> Result<Json<Vec<UserPathway>>> {
    let plan = ctx.usage.plan(&user.uid).await?;
    Ok(Json(ctx.user_pathways.list(&user.uid, plan).await?))
}

#[derive(Debug, Deserialize)]
pub struct SaveBody {
    profile: PathwayProfile,
}

/// Resolve the profile and keep the result as the caller's pathway.
///
/// Gated and counted like `/pathways/resolve`. Free users get the limited
/// view stored.
pub async fn save_pathway(
    State(ctx): State<Arc<AppContext>>,
    user: AuthUser,
    ApiJson(body): ApiJson<SaveBody>,
) -> Result<(StatusCode, Json<SavedPathway>)> {
    body.profile.validate()?;
    let (resolved, usage) = ctx.resolve_for(&user.uid, &body.profile).await?;
    let template = view_for_plan(resolved.template, usage.plan);

    let saved = ctx.user_pathways.save(&user.uid, &template).await?;
    let status = if saved.merged {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(saved)))
}

pub async fn update_step(
    State(ctx): State<Arc<AppContext>>,
    user: AuthUser,
    ApiPath((id, number)): ApiPath<(String, u32)>,
    ApiJson(update): ApiJson<StepUpdate>,
) -> Result<Json<UserPathway>> {
    Ok(Json(
        ctx.user_pathways
            .update_step(&user.uid, &id, number, update)
            .await?,
    ))
}
