//! Request extractors

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::debug;

/// The authenticated caller, resolved from the bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Id carried by the token
    pub user_id: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let user_id = state
            .auth
            .tokens()
            .user_id_from_header(header)
            .map_err(|e| {
                debug!(error = ?e, "Rejected bearer token");
                AppError::Unauthorized
            })?;

        Ok(Self { user_id })
    }
}
