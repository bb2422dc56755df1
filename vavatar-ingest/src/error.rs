//! Error types for the HTTP surface

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::{BatchError, CommitError};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - batch busy or not ready
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Commit with no entries (422)
    #[error("Nothing to commit: the batch has no entries")]
    EmptyBatch,

    /// Storage collaborator failed (502); batch kept for retry
    #[error("{0}")]
    PersistFailure(String),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<BatchError> for ApiError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::Busy(_) | BatchError::NotReady(_) | BatchError::AlreadyStored { .. } => {
                ApiError::Conflict(err.to_string())
            }
            BatchError::InvalidName => ApiError::BadRequest(err.to_string()),
            BatchError::Picker(e) => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl From<CommitError> for ApiError {
    fn from(err: CommitError) -> Self {
        match err {
            CommitError::EmptyBatch => ApiError::EmptyBatch,
            CommitError::NotReady(_) => ApiError::Conflict(err.to_string()),
            CommitError::PersistFailure { .. } => ApiError::PersistFailure(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::EmptyBatch => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "EMPTY_BATCH",
                ApiError::EmptyBatch.to_string(),
            ),
            ApiError::PersistFailure(msg) => (StatusCode::BAD_GATEWAY, "PERSIST_FAILURE", msg),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
