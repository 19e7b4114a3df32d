//! Authentication API handlers
//!
//! OTP and MPIN sign-in plus profile endpoints under `/api/auth`.

use super::extract::AuthUser;
use super::response::ApiResponse;
use super::utils::json_body;
use crate::db::ProfileUpdate;
use crate::error::AppError;
use crate::services::auth::{LoginData, ProfileData, ProfileUpdateData};
use crate::state::AppState;
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/auth/request-otp`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestOtpRequest {
    /// Address to mail the code to
    pub email: String,
}

/// Body of `POST /api/auth/verify-otp`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyOtpRequest {
    /// Address the code was sent to
    pub email: String,
    /// Six-digit code from the mail
    pub otp: String,
}

/// Body of `POST /api/auth/login-mpin`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MpinLoginRequest {
    /// Account email
    pub email: String,
    /// Six-digit MPIN
    pub mpin: String,
}

/// Body of `PUT /api/auth/profile`; omitted fields stay as they are
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdateRequest {
    /// New display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New department
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    /// New designation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
}

/// POST /api/auth/request-otp
pub async fn request_otp(
    State(state): State<AppState>,
    payload: Result<Json<RequestOtpRequest>, JsonRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let request = json_body(payload)?;
    state.auth.request_otp(&request.email).await?;
    Ok(ApiResponse::message("OTP has been sent to your email address"))
}

/// POST /api/auth/verify-otp
pub async fn verify_otp(
    State(state): State<AppState>,
    payload: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Result<ApiResponse<LoginData>, AppError> {
    let request = json_body(payload)?;
    let login = state.auth.verify_otp(&request.email, &request.otp).await?;
    Ok(ApiResponse::ok("OTP verified successfully", login))
}

/// POST /api/auth/login-mpin
pub async fn login_mpin(
    State(state): State<AppState>,
    payload: Result<Json<MpinLoginRequest>, JsonRejection>,
) -> Result<ApiResponse<LoginData>, AppError> {
    let request = json_body(payload)?;
    let login = state.auth.login_mpin(&request.email, &request.mpin).await?;
    Ok(ApiResponse::ok("Login successful", login))
}

/// GET /api/auth/profile
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<ApiResponse<ProfileData>, AppError> {
    let profile = state.auth.get_profile(&user.user_id).await?;
    Ok(ApiResponse::ok("Profile retrieved successfully", profile))
}

/// PUT /api/auth/profile
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<ProfileUpdateRequest>, JsonRejection>,
) -> Result<ApiResponse<ProfileUpdateData>, AppError> {
    let request = json_body(payload)?;
    let update = ProfileUpdate {
        name: request.name,
        department: request.department,
        designation: request.designation,
    };
    let updated = state.auth.update_profile(&user.user_id, update).await?;
    Ok(ApiResponse::ok("Profile updated successfully", updated))
}

/// POST /api/auth/set-mpin
pub async fn set_mpin(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<ApiResponse<()>, AppError> {
    state.auth.set_mpin(&user.user_id).await?;
    Ok(ApiResponse::message("MPIN generated and sent to your email."))
}
