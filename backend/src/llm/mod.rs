//! Language model access
//!
//! The query service talks to a [`LanguageModel`]; production uses
//! [`GeminiClient`], tests substitute a [`ScriptedModel`].

pub mod gemini;
pub mod prompts;
pub mod scripted;
pub mod types;

pub use gemini::GeminiClient;
pub use scripted::ScriptedModel;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from a language model call
#[derive(Error, Debug)]
pub enum LlmError {
    /// Client built without a key
    #[error("API key is empty")]
    MissingApiKey,

    /// Model list is empty
    #[error("No Gemini model configured")]
    NoModels,

    /// Transport failure
    #[error("Failed to send HTTP request to Gemini API: {0}")]
    Request(String),

    /// HTTP 429 from every model
    #[error("Gemini API rate limit exceeded (HTTP 429): {0}")]
    RateLimited(String),

    /// Non-success HTTP status
    #[error("Gemini API returned error status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, for the log
        body: String,
    },

    /// Response body did not decode
    #[error("Failed to parse JSON response from Gemini API: {0}")]
    Parse(String),

    /// Prompt rejected by safety filters
    #[error("Gemini API blocked the prompt: {0}")]
    Blocked(String),

    /// Response had no candidates
    #[error("Gemini API response contains no candidates")]
    NoCandidates,

    /// Candidate had no parts
    #[error("Gemini API response candidate contains no parts")]
    NoParts,

    /// Candidate text was empty
    #[error("Gemini API response text is empty")]
    EmptyText,
}

/// A text-in, text-out model
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Whether credentials are present
    fn is_configured(&self) -> bool;

    /// Complete a prompt
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}
