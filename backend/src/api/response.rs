//! Success envelope shared by every JSON endpoint
//!
//! Failures render the same shape through `AppError`.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// `{status, message, data}` envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// `true` on success
    pub status: bool,
    /// Human readable outcome
    pub message: String,
    /// Payload, `null` when there is none
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying `data`
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Successful response without a payload
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: true,
            message: message.into(),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
