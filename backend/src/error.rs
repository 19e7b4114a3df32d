//! Error types and error handling for the application
//!
//! This module defines custom error types that can be converted to HTTP responses.
//! All errors render as the standard `{status, message, data}` envelope with
//! `status: false` and `data: null`, so clients only ever parse one shape.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error types
///
/// Variants carrying a `String` hold the user-facing message verbatim.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing, malformed or expired bearer token
    #[error("Unauthorized")]
    Unauthorized,

    /// Request payload failed validation
    #[error("{0}")]
    Validation(String),

    /// Credentials (OTP / MPIN) were rejected
    #[error("{0}")]
    InvalidCredentials(String),

    /// Requested resource does not exist or is not owned by the caller
    #[error("{0}")]
    NotFound(String),

    /// Uploaded file could not be turned into a table
    #[error(transparent)]
    Ingest(#[from] crate::ingest::IngestError),

    /// Token could not be issued or verified
    #[error(transparent)]
    Token(#[from] crate::auth::TokenError),

    /// Language model call failed
    #[error("{0}")]
    Upstream(String),

    /// Outgoing mail could not be dispatched
    #[error("{0}")]
    Mail(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status code this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Ingest(_) => StatusCode::BAD_REQUEST,
            AppError::Token(_) => StatusCode::UNAUTHORIZED,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Mail(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        }

        let body = Json(json!({
            "status": false,
            "message": self.to_string(),
            "data": null,
        }));

        (status, body).into_response()
    }
}
