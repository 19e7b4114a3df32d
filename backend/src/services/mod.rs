//! Service layer for business logic
//!
//! Handlers stay thin: they validate the request shape, then call into one
//! of these services.

pub mod auth;
pub mod query;
pub mod uploads;

pub use auth::AuthService;
pub use query::{QueryParams, QueryService};
pub use uploads::UploadService;
