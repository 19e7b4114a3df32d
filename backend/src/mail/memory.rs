//! In-memory mailer
//!
//! Keeps every accepted message so callers (and tests) can read back the
//! codes that would have been emailed.

use super::{Mail, MailError, Mailer};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Captures outgoing mail in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryMailer {
    outbox: Arc<Mutex<Vec<Mail>>>,
    reject: bool,
}

impl MemoryMailer {
    /// Create an empty mailer that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mailer that refuses every message
    pub fn rejecting() -> Self {
        Self {
            outbox: Arc::default(),
            reject: true,
        }
    }

    /// Messages accepted so far
    pub fn sent(&self) -> Vec<Mail> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }

    /// Most recent message sent to `to`
    pub fn last_to(&self, to: &str) -> Option<Mail> {
        self.sent().into_iter().rev().find(|m| m.to == to)
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: Mail) -> Result<(), MailError> {
        if self.reject {
            return Err(MailError::Transport("delivery disabled".to_string()));
        }
        if let Ok(mut outbox) = self.outbox.lock() {
            outbox.push(mail);
        }
        Ok(())
    }
}
