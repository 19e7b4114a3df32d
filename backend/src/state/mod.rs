//! State management module
//!
//! Shared services handed to every request handler.

/// [`AppState`] and its construction
pub mod app_state;

pub use app_state::AppState;
