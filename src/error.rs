// src/error.rs

//! Unified error handling for the advising backend.

use std::fmt;

use thiserror::Error;

/// Result type alias for application operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request or data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or invalid credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Document not found
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Upstream API answered with an unusable payload
    #[error("Upstream error from {service}: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },

    /// Feature usage denied by the subscription plan
    #[error("{0}")]
    LimitReached(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// Create a not-found error for a document kind.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create an upstream error with context.
    pub fn upstream(service: &'static str, message: impl fmt::Display) -> Self {
        Self::Upstream {
            service,
            message: message.to_string(),
        }
    }
}

#[cfg(feature = "server")]
mod response {
    use axum::{
        Json,
        extract::rejection::{JsonRejection, PathRejection, QueryRejection},
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    use serde_json::json;

    use super::AppError;

    impl From<JsonRejection> for AppError {
        fn from(rejection: JsonRejection) -> Self {
            AppError::Validation(rejection.body_text())
        }
    }

    impl From<QueryRejection> for AppError {
        fn from(rejection: QueryRejection) -> Self {
            AppError::Validation(rejection.body_text())
        }
    }

    impl From<PathRejection> for AppError {
        fn from(rejection: PathRejection) -> Self {
            AppError::Validation(rejection.body_text())
        }
    }

    impl AppError {
        /// HTTP status used when this error reaches the REST layer.
        pub fn status(&self) -> StatusCode {
            match self {
                AppError::Validation(_) | AppError::Json(_) | AppError::Url(_) => {
                    StatusCode::BAD_REQUEST
                }
                AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                AppError::Forbidden(_) | AppError::LimitReached(_) => StatusCode::FORBIDDEN,
                AppError::NotFound { .. } => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            let status = self.status();
            if status.is_server_error() {
                log::error!("Request failed: {}", self);
            }

            (status, Json(json!({ "error": self.to_string() }))).into_response()
        }
    }
}
