//! Client-side error types
//!
//! Every failure talking to the gateway is normalized into [`ClientError`].

use thiserror::Error;

/// Errors returned by [`super::ApiClient`]
#[derive(Error, Debug)]
pub enum ClientError {
    /// The server answered with a failure envelope or an error status
    #[error("{message} (HTTP {status})")]
    Api {
        /// HTTP status code
        status: u16,
        /// Message from the envelope, or the raw body text
        message: String,
    },

    /// The stored token was rejected; it has been cleared
    #[error("Session expired or invalid. Please log in again.")]
    Unauthorized,

    /// The server could not be reached
    #[error("Network error: {0}")]
    Network(String),

    /// The response did not have the expected shape
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Network(e.to_string())
        }
    }
}
