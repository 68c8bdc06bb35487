// src/api/mod.rs

//! REST layer over [`AppContext`].
//!
//! Every route lives under `/api`. Authenticated routes take a Firebase ID
//! token (or a configured dev token) as `Authorization: Bearer <token>`;
//! admin routes also require the token's e-mail on the admin list.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, patch, post};
use serde::de::DeserializeOwned;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::app::AppContext;
use crate::error::{AppError, Result};
use crate::models::ServerConfig;

mod extract;
mod pathways;
mod tools;
mod universities;
mod users;

pub use extract::{AdminUser, ApiJson, ApiPath, ApiQuery, bearer_token};

/// Build the application router.
pub fn router(ctx: Arc<AppContext>) -> Result<Router> {
    let cors = cors_layer(&ctx.config.server)?;

    Ok(Router::new()
        .route("/api/health", get(tools::health))
        .route("/api/auth/register", post(users::register))
        .route("/api/auth/me", get(users::me))
        .route(
            "/api/universities",
            get(universities::list).post(universities::create),
        )
        .route(
            "/api/universities/{id}",
            get(universities::get)
                .put(universities::update)
                .delete(universities::delete),
        )
        .route("/api/universities/{id}/verify", post(universities::verify))
        .route(
            "/api/users/profile",
            get(users::get_profile).put(users::update_profile),
        )
        .route("/api/users/dashboard", get(users::dashboard))
        .route(
            "/api/users/pathways",
            get(users::list_pathways).post(users::save_pathway),
        )
        .route(
            "/api/users/pathways/{id}/steps/{number}",
            patch(users::update_step),
        )
        .route("/api/pathways/resolve", post(pathways::resolve))
        .route("/api/pathways/analysis", post(pathways::analysis))
        .route("/api/currency/convert", get(tools::convert_currency))
        .route("/api/cgpa/convert", get(tools::convert_cgpa_value))
        .layer(cors)
        .with_state(ctx))
}

fn cors_layer(config: &ServerConfig) -> Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    if config.cors_origins.is_empty() {
        return Ok(layer.allow_origin(Any));
    }

    let origins = config
        .cors_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|_| AppError::config(format!("Invalid CORS origin: {origin}")))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}

/// Bind the configured address and serve until Ctrl+C or SIGTERM.
pub async fn serve(ctx: Arc<AppContext>) -> Result<()> {
    let address = format!("{}:{}", ctx.config.server.host, ctx.config.server.port);
    let app = router(ctx)?;

    log::info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    log::info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => log::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                log::error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                log::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Parse a JSON body that may be empty.
pub(crate) fn optional_json<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    Ok(serde_json::from_slice(body)?)
}
