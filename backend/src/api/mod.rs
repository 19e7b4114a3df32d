//! API module
//!
//! HTTP handlers and the router that mounts them.

pub mod agent;
pub mod auth;
pub mod extract;
pub mod response;
pub mod utils;

pub use extract::AuthUser;
pub use response::ApiResponse;

use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use serde::Serialize;

#[derive(Serialize)]
struct BannerResponse {
    version: String,
    docs: String,
}

/// Build the application router
///
/// Middleware (request ids, tracing, CORS) is layered on by the binary.
pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/request-otp", post(auth::request_otp))
        .route("/verify-otp", post(auth::verify_otp))
        .route("/login-mpin", post(auth::login_mpin))
        .route(
            "/profile",
            get(auth::get_profile).put(auth::update_profile),
        )
        .route("/set-mpin", post(auth::set_mpin));

    let agent_routes = Router::new()
        .route(
            "/upload-excel",
            post(agent::upload_excel)
                .layer(DefaultBodyLimit::max(state.max_upload_bytes())),
        )
        .route("/query", post(agent::query))
        .route("/files", get(agent::list_files))
        .route("/files/:file_id", delete(agent::delete_file));

    Router::new()
        .route("/", get(banner))
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api/agent", agent_routes)
        .with_state(state)
}

async fn banner() -> ApiResponse<BannerResponse> {
    ApiResponse::ok(
        "Indore Smart City Development API",
        BannerResponse {
            version: env!("CARGO_PKG_VERSION").to_string(),
            docs: "/docs".to_string(),
        },
    )
}

async fn health_check() -> ApiResponse<()> {
    ApiResponse::message("API is healthy")
}
