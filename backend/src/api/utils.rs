//! API utility functions
//!
//! Request validation shared by the handlers.

use crate::error::AppError;
use crate::query::{QueryMode, QueryRequest};
use crate::services::QueryParams;
use axum::extract::rejection::JsonRejection;
use axum::Json;

/// Maximum query length in characters
pub const MAX_QUERY_LENGTH: usize = 10_000;

/// Rows returned when the request does not say
pub const DEFAULT_TOP_K: usize = 5;

/// Largest accepted `top_k`
pub const MAX_TOP_K: i64 = 50;

/// Validate query string
///
/// # Returns
/// * `Ok(())` - Query is valid
/// * `Err(AppError)` - Query is empty or too long
pub fn validate_query(query: &str) -> Result<(), AppError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Query cannot be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_QUERY_LENGTH {
        return Err(AppError::Validation(format!(
            "Query exceeds maximum length of {} characters",
            MAX_QUERY_LENGTH
        )));
    }
    Ok(())
}

/// Requested row count, defaulted and range checked
pub fn resolve_top_k(top_k: Option<i64>) -> Result<usize, AppError> {
    match top_k {
        None => Ok(DEFAULT_TOP_K),
        Some(k) if (1..=MAX_TOP_K).contains(&k) => Ok(k as usize),
        Some(_) => Err(AppError::Validation(format!(
            "top_k must be between 1 and {}",
            MAX_TOP_K
        ))),
    }
}

/// Unwrap a JSON body, reporting rejections in the error envelope
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| AppError::Validation(e.body_text()))
}

/// Turn a query request body into service parameters
pub fn query_params(request: QueryRequest) -> Result<QueryParams, AppError> {
    validate_query(&request.query)?;
    Ok(QueryParams {
        top_k: resolve_top_k(request.top_k)?,
        mode: QueryMode::parse(request.mode.as_deref()),
        table_name: request.table_name.filter(|t| !t.trim().is_empty()),
        question: request.query.trim().to_string(),
    })
}
