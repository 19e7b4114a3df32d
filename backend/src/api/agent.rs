//! Agent API handlers
//!
//! Upload, query and file management endpoints under `/api/agent`.

use super::extract::AuthUser;
use super::response::ApiResponse;
use super::utils::{json_body, query_params};
use crate::error::AppError;
use crate::query::{QueryRequest, QueryResponse};
use crate::services::uploads::{DeletedFile, FileList, UploadData};
use crate::state::AppState;
use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::JsonRejection,
        Multipart, Path, State,
    },
    Json,
};
use tracing::{info, warn};

/// Multipart field carrying the spreadsheet
const FILE_FIELD: &str = "file";

/// POST /api/agent/upload-excel
///
/// Accepts multipart form data with a single `file` field.
pub async fn upload_excel(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<UploadData>, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::Validation(e.body_text()))?;
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("Failed to read multipart field: {}", e);
        AppError::Validation(format!("Invalid multipart body: {}", e))
    })? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(|e| {
            warn!("Failed to read uploaded file: {}", e);
            AppError::Validation(format!("Failed to read uploaded file: {}", e))
        })?;
        upload = Some((filename, data.to_vec()));
    }

    let (filename, content) =
        upload.ok_or_else(|| AppError::Validation("No file provided".to_string()))?;
    info!(filename = %filename, bytes = content.len(), "Upload received");

    let data = state
        .uploads
        .upload(&user.user_id, &filename, content)
        .await?;
    Ok(ApiResponse::ok(
        format!("Successfully uploaded and stored {} rows", data.rows_stored),
        data,
    ))
}

/// POST /api/agent/query
pub async fn query(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<ApiResponse<QueryResponse>, AppError> {
    let params = query_params(json_body(payload)?)?;
    let response = state.query.query(&user.user_id, params).await?;
    Ok(ApiResponse::ok("Query processed successfully", response))
}

/// GET /api/agent/files
pub async fn list_files(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<ApiResponse<FileList>, AppError> {
    let listing = state.uploads.list(&user.user_id).await?;
    Ok(ApiResponse::ok(
        format!("Found {} uploaded file(s)", listing.total_count),
        listing,
    ))
}

/// DELETE /api/agent/files/:file_id
pub async fn delete_file(
    State(state): State<AppState>,
    user: AuthUser,
    Path(file_id): Path<String>,
) -> Result<ApiResponse<DeletedFile>, AppError> {
    let deleted = state.uploads.delete(&user.user_id, &file_id).await?;
    Ok(ApiResponse::ok(
        format!(
            "Successfully deleted file '{}' and its database table",
            deleted.filename
        ),
        deleted,
    ))
}
