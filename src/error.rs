//! Error types for the ledger, configuration and HTTP layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::model::BlockEntry;

/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("event must not be empty")]
    EmptyEvent,

    #[error("integrity violation at index {index}: {reason}")]
    IntegrityViolation { index: u64, reason: String },

    #[error("ledger lock poisoned")]
    LockPoisoned,

    #[error("time format error: {0}")]
    Clock(String),
}

/// Errors raised while reading process configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("unreadable env file: {0}")]
    EnvFile(String),
}

/// Failures surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("malformed request body: {0}")]
    BadRequest(String),

    #[error("{reason}")]
    Rejected {
        reason: String,
        request: Box<BlockEntry>,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            ApiError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Rejected { request, .. } => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": message, "request": request })),
            )
                .into_response(),
            ApiError::Ledger(err) => {
                tracing::error!(error = %err, "ledger failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": message })),
                )
                    .into_response()
            }
        }
    }
}
