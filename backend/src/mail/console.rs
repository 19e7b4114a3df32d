//! Development mailer that writes messages to the log

use super::{Mail, MailError, Mailer};
use async_trait::async_trait;

/// Logs mail instead of sending it
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, mail: Mail) -> Result<(), MailError> {
        tracing::warn!(
            to = %mail.to,
            subject = %mail.subject,
            body = %mail.text_body,
            "Email not configured, logging message instead of sending"
        );
        Ok(())
    }
}
