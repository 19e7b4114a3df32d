//! Gemini API client
//!
//! Direct HTTP client for the Gemini `generateContent` endpoint. Models are
//! tried in the configured order until one of them answers.

use super::types::{GeminiApiRequest, GeminiApiResponse};
use super::{LanguageModel, LlmError};
use crate::config::LlmConfig;
use async_trait::async_trait;
use std::time::Duration;

/// Gemini client over a shared connection pool
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    models: Vec<String>,
    base_url: String,
}

impl GeminiClient {
    /// Build a client from configuration
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Request(e.to_string()))?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            models: config.models.clone(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Call a single model
    ///
    /// # Errors
    /// Returns an [`LlmError`] when the request fails, the API answers with an
    /// error status, the body does not parse, the prompt was blocked, or no
    /// text came back.
    pub async fn call_model(
        &self,
        api_key: &str,
        model: &str,
        prompt: &str,
    ) -> Result<String, LlmError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        tracing::debug!(
            model = %model,
            prompt_len = prompt.len(),
            "Calling Gemini API"
        );

        let response = self
            .http
            .post(&url)
            .query(&[("key", api_key)])
            .json(&GeminiApiRequest::from_prompt(prompt))
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());

            tracing::error!(
                status_code = status_code,
                model = %model,
                error_body = %error_body,
                "Gemini API returned error status"
            );

            if status_code == 429 {
                return Err(LlmError::RateLimited(error_body));
            }
            return Err(LlmError::Status {
                status: status_code,
                body: error_body,
            });
        }

        let response_body = response
            .text()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let parsed: GeminiApiResponse = serde_json::from_str(&response_body)
            .map_err(|e| LlmError::Parse(format!("{} - Response body: {}", e, response_body)))?;

        if let Some(reason) = parsed
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_ref())
        {
            return Err(LlmError::Blocked(reason.clone()));
        }

        let candidate = parsed.candidates.first().ok_or(LlmError::NoCandidates)?;
        let part = candidate.content.parts.first().ok_or(LlmError::NoParts)?;

        let text = part.text.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyText);
        }

        tracing::debug!(
            model = %model,
            response_len = text.len(),
            "Received response from Gemini API"
        );
        Ok(text.to_string())
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let api_key = match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => return Err(LlmError::MissingApiKey),
        };

        let mut last_error = LlmError::NoModels;
        for model in &self.models {
            match self.call_model(api_key, model, prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    tracing::warn!(model = %model, error = %e, "Gemini model failed, trying next");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serial_test::serial;

    fn client(base_url: &str, models: &[&str]) -> GeminiClient {
        GeminiClient::new(&LlmConfig {
            api_key: Some("test-key".to_string()),
            models: models.iter().map(|m| m.to_string()).collect(),
            api_base_url: base_url.to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn key_matcher() -> Matcher {
        Matcher::UrlEncoded("key".into(), "test-key".into())
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let client = GeminiClient::new(&LlmConfig::default()).unwrap();
        assert!(!client.is_configured());
        let result = client.generate("test prompt").await;
        assert!(matches!(result, Err(LlmError::MissingApiKey)));
    }

    #[tokio::test]
    #[serial]
    async fn test_generate_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(key_matcher())
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJsonString(
                r#"{"contents":[{"parts":[{"text":"test prompt"}]}]}"#.to_string(),
            ))
            .with_status(200)
            .with_body(
                r#"{
                    "candidates": [{
                        "content": {
                            "parts": [{"text": "  SELECT COUNT(*) FROM t  "}],
                            "role": "model"
                        }
                    }]
                }"#,
            )
            .create_async()
            .await;

        let client = client(&server.url(), &["gemini-2.5-flash"]);
        let result = client.generate("test prompt").await.unwrap();

        mock.assert_async().await;
        assert_eq!(result, "SELECT COUNT(*) FROM t");
    }

    #[tokio::test]
    #[serial]
    async fn test_falls_back_to_next_model() {
        let mut server = Server::new_async().await;
        let missing = server
            .mock("POST", "/models/retired-model:generateContent")
            .match_query(key_matcher())
            .with_status(404)
            .with_body(r#"{"error": "model not found"}"#)
            .create_async()
            .await;
        let working = server
            .mock("POST", "/models/gemini-2.0-flash:generateContent")
            .match_query(key_matcher())
            .with_status(200)
            .with_body(r#"{"candidates": [{"content": {"parts": [{"text": "ok"}]}}]}"#)
            .create_async()
            .await;

        let client = client(&server.url(), &["retired-model", "gemini-2.0-flash"]);
        let result = client.generate("prompt").await.unwrap();

        missing.assert_async().await;
        working.assert_async().await;
        assert_eq!(result, "ok");
    }

    #[tokio::test]
    #[serial]
    async fn test_last_error_reported_when_all_models_fail() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(key_matcher())
            .with_status(429)
            .with_body(r#"{"error": "Rate limit exceeded"}"#)
            .create_async()
            .await;

        let client = client(&server.url(), &["gemini-2.5-flash"]);
        let err = client.generate("prompt").await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, LlmError::RateLimited(_)));
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    #[serial]
    async fn test_empty_candidates() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(key_matcher())
            .with_status(200)
            .with_body(r#"{"candidates": []}"#)
            .create_async()
            .await;

        let client = client(&server.url(), &["gemini-2.5-flash"]);
        let err = client.generate("prompt").await.unwrap_err();

        mock.assert_async().await;
        assert!(err.to_string().contains("no candidates"));
    }

    #[tokio::test]
    #[serial]
    async fn test_blocked_prompt() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(key_matcher())
            .with_status(200)
            .with_body(r#"{"candidates": [], "promptFeedback": {"blockReason": "SAFETY"}}"#)
            .create_async()
            .await;

        let client = client(&server.url(), &["gemini-2.5-flash"]);
        let err = client.generate("prompt").await.unwrap_err();

        mock.assert_async().await;
        assert!(
            err.to_string().contains("blocked the prompt"),
            "unexpected error: {}",
            err
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_invalid_json() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(key_matcher())
            .with_status(200)
            .with_body("This is not JSON")
            .create_async()
            .await;

        let client = client(&server.url(), &["gemini-2.5-flash"]);
        let err = client.generate("prompt").await.unwrap_err();

        mock.assert_async().await;
        assert!(err.to_string().contains("Failed to parse JSON"));
    }

    #[tokio::test]
    #[serial]
    async fn test_empty_text() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(key_matcher())
            .with_status(200)
            .with_body(r#"{"candidates": [{"content": {"parts": [{"text": "   "}]}}]}"#)
            .create_async()
            .await;

        let client = client(&server.url(), &["gemini-2.5-flash"]);
        let err = client.generate("prompt").await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, LlmError::EmptyText));
    }
}
