// src/api/pathways.rs

//! Pathway resolution and analysis routes.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use chrono::Utc;
use serde::Serialize;

use super::ApiJson;
use crate::app::AppContext;
use crate::error::{AppError, Result};
use crate::models::{Feature, PathwayProfile, PathwayTemplate};
use crate::services::usage::{evaluate, view_for_plan};
use crate::services::{AuthUser, Gate, PathwaySource};

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pathway: PathwayTemplate,
    source: PathwaySource,
    usage: Gate,
}

/// Gated resolution. Only fresh AI generations count against the plan.
pub async fn resolve(
    State(ctx): State<Arc<AppContext>>,
    user: AuthUser,
    ApiJson(profile): ApiJson<PathwayProfile>,
) -> Result<Json<ResolveResponse>> {
    profile.validate()?;
    let (resolved, usage) = ctx.resolve_for(&user.uid, &profile).await?;

    Ok(Json(ResolveResponse {
        usage: evaluate(&usage, Feature::PathwayGeneration, Utc::now()),
        pathway: view_for_plan(resolved.template, usage.plan),
        source: resolved.source,
    }))
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    analysis: String,
    pathway_key: String,
    usage: Gate,
}

/// Free-form AI analysis of the resolved pathway. No static fallback.
///
/// Needs an analysis left on the plan. The pathway itself is resolved
/// through the same generation gate as [`resolve`].
pub async fn analysis(
    State(ctx): State<Arc<AppContext>>,
    user: AuthUser,
    ApiJson(profile): ApiJson<PathwayProfile>,
) -> Result<Json<AnalysisResponse>> {
    profile.validate()?;

    let usage = ctx.usage.usage(&user.uid).await?;
    if let Gate::Denied { upgrade_prompt } =
        evaluate(&usage, Feature::DetailedAnalysis, Utc::now())
    {
        return Err(AppError::LimitReached(upgrade_prompt));
    }

    let generator = ctx
        .generator()
        .ok_or_else(|| AppError::upstream("ai", "no generative model is configured"))?;

    let (resolved, _) = ctx.resolve_for(&user.uid, &profile).await?;
    let analysis = generator.analyze(&profile, &resolved.template).await?;
    let usage = ctx.usage.record(&user.uid, Feature::DetailedAnalysis).await?;

    Ok(Json(AnalysisResponse {
        analysis,
        pathway_key: resolved.template.key,
        usage: evaluate(&usage, Feature::DetailedAnalysis, Utc::now()),
    }))
}
