//! Scripted language model
//!
//! Replays canned replies in order and records every prompt it was given.
//! Used to drive the query pipeline without network access.

use super::{LanguageModel, LlmError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<Result<String, String>>,
    prompts: Vec<String>,
}

/// Language model with predetermined replies
#[derive(Debug, Clone, Default)]
pub struct ScriptedModel {
    script: Arc<Mutex<Script>>,
    unconfigured: bool,
}

impl ScriptedModel {
    /// Model that answers with `replies`, one per call
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let model = Self::default();
        for reply in replies {
            model.push_reply(reply);
        }
        model
    }

    /// Model that reports missing credentials
    pub fn unconfigured() -> Self {
        Self {
            unconfigured: true,
            ..Self::default()
        }
    }

    /// Queue a successful reply
    pub fn push_reply(&self, reply: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.replies.push_back(Ok(reply.into()));
        }
    }

    /// Queue a failure
    pub fn push_failure(&self, message: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.replies.push_back(Err(message.into()));
        }
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.script
            .lock()
            .map(|s| s.prompts.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn is_configured(&self) -> bool {
        !self.unconfigured
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        if self.unconfigured {
            return Err(LlmError::MissingApiKey);
        }
        let mut script = self
            .script
            .lock()
            .map_err(|_| LlmError::Request("script poisoned".to_string()))?;
        script.prompts.push(prompt.to_string());
        match script.replies.pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(body)) => Err(LlmError::Status { status: 500, body }),
            None => Err(LlmError::NoCandidates),
        }
    }
}
