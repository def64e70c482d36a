//! HTTP API error types.
//!
//! A unified `ApiError` enum for consistent error responses across the
//! HTTP layer, with the engine-error mapping from the design taxonomy:
//! validation 400, unknown id 404, stale version and illegal transitions
//! 409, encoding and storage failures 500. Rate limiting (429) is built
//! directly at the ingest handler, which knows the retry window.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tiller_engine::error::EngineError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    /// Stale version token or illegal state transition.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rate limit exceeded")]
    TooManyRequests { retry_after_secs: u64 },

    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(msg) => ApiError::BadRequest(msg),
            EngineError::NotFound(what) => ApiError::NotFound(what),
            EngineError::Conflict { .. } => ApiError::Conflict(err.to_string()),
            EngineError::InvalidTransition { .. } => ApiError::Conflict(err.to_string()),
            EngineError::Encoding(_) | EngineError::Internal(_) => {
                ApiError::InternalError(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::TooManyRequests { retry_after_secs } = self {
            return (
                StatusCode::TOO_MANY_REQUESTS,
                [("Retry-After", retry_after_secs.max(1).to_string())],
                Json(json!({ "error": "rate_limit_exceeded" })),
            )
                .into_response();
        }

        let (status, error_message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::TooManyRequests { .. } => unreachable!(),
        };

        (status, Json(json!({ "error": error_message }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
