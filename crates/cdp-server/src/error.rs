//! Server-specific error types
//!
//! `AppError` is the engine-wide taxonomy every feature error converges to
//! before crossing the HTTP boundary. Structural errors (bad ids, invalid
//! parameters) surface immediately; transient errors are retried inside
//! the owning component and only appear here after exhausting retries.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::response::ErrorResponse;

/// Result type alias for API operations
pub type ApiResult<T> = std::result::Result<T, AppError>;

/// Application error taxonomy
#[derive(Error, Debug)]
pub enum AppError {
    /// Unknown id or missing entity
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input to an operation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Uniqueness or state conflict (duplicate mapping, duplicate name, ...)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A connector could not enumerate source attributes after retries;
    /// the source is marked degraded, not removed
    #[error("Scan failure: {0}")]
    ScanFailure(String),

    /// Cancel/validate requested on an entity that cannot accept the
    /// operation in its current state
    #[error("Already terminal: {0}")]
    AlreadyTerminal(String),

    /// A fix could not be applied after exhausting retries; the
    /// materialized data is left untouched
    #[error("Fix application failed: {0}")]
    FixApplication(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    fn code_and_status(&self) -> (&'static str, StatusCode) {
        match self {
            AppError::NotFound(_) => ("NOT_FOUND", StatusCode::NOT_FOUND),
            AppError::Validation(_) => ("VALIDATION_ERROR", StatusCode::BAD_REQUEST),
            AppError::Conflict(_) => ("CONFLICT", StatusCode::CONFLICT),
            AppError::ScanFailure(_) => ("SCAN_FAILURE", StatusCode::BAD_GATEWAY),
            AppError::AlreadyTerminal(_) => ("ALREADY_TERMINAL", StatusCode::CONFLICT),
            AppError::FixApplication(_) => {
                ("FIX_APPLICATION_FAILED", StatusCode::INTERNAL_SERVER_ERROR)
            },
            AppError::Internal(_) => ("INTERNAL_ERROR", StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, status) = self.code_and_status();

        let message = match &self {
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            },
            other => other.to_string(),
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}
