//! Gemini API wire types
//!
//! Structs that mirror the `generateContent` JSON request and response.
//! The API answers in camelCase; snake_case aliases are accepted too.

use serde::{Deserialize, Serialize};

/// Top-level Gemini API response
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GeminiApiResponse {
    /// Candidate responses from the model
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Feedback about the prompt (e.g., if it was blocked)
    #[serde(default, alias = "prompt_feedback")]
    pub prompt_feedback: Option<PromptFeedback>,
}

/// A single candidate response
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Candidate content; absent when generation was stopped early
    #[serde(default)]
    pub content: Content,
    /// Why the model stopped generating
    #[serde(default, alias = "finish_reason")]
    pub finish_reason: Option<String>,
}

/// Content parts of a candidate
#[derive(Deserialize, Debug, Default)]
pub struct Content {
    /// Text parts
    #[serde(default)]
    pub parts: Vec<Part>,
    /// `model` for generated content
    #[serde(default)]
    pub role: Option<String>,
}

/// A single text part
#[derive(Deserialize, Debug)]
pub struct Part {
    /// Part text
    #[serde(default)]
    pub text: String,
}

/// Feedback about the prompt
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Reason the prompt was blocked
    #[serde(default, alias = "block_reason")]
    pub block_reason: Option<String>,
}

/// Request body for `generateContent`
#[derive(Serialize, Debug)]
pub struct GeminiApiRequest {
    /// Conversation turns; a single one here
    pub contents: Vec<RequestContent>,
}

impl GeminiApiRequest {
    /// Single-turn text request
    pub fn from_prompt(prompt: &str) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: prompt.to_string(),
                }],
            }],
        }
    }
}

/// One turn of a request
#[derive(Serialize, Debug)]
pub struct RequestContent {
    /// Text parts
    pub parts: Vec<RequestPart>,
}

/// Text of a request turn
#[derive(Serialize, Debug)]
pub struct RequestPart {
    /// Part text
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_camel_case_response() {
        let body = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "SELECT 1"}], "role": "model"},
                "finishReason": "STOP"
            }],
            "promptFeedback": {"blockReason": "SAFETY"}
        }"#;
        let parsed: GeminiApiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.candidates[0].content.parts[0].text, "SELECT 1");
        assert_eq!(parsed.candidates[0].finish_reason.as_deref(), Some("STOP"));
        assert_eq!(
            parsed.prompt_feedback.unwrap().block_reason.as_deref(),
            Some("SAFETY")
        );
    }

    #[test]
    fn test_candidate_without_content() {
        let body = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;
        let parsed: GeminiApiResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.candidates[0].content.parts.is_empty());
    }

    #[test]
    fn test_request_shape() {
        let json = serde_json::to_value(GeminiApiRequest::from_prompt("hi")).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
    }
}
