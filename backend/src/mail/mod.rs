//! Outgoing mail
//!
//! One-time codes and MPINs reach users by email. Delivery goes through the
//! [`Mailer`] trait so the auth service does not care whether mail leaves
//! over SMTP, is printed to the log in development, or is captured in tests.

pub mod console;
pub mod memory;
pub mod smtp;

pub use console::ConsoleMailer;
pub use memory::MemoryMailer;
pub use smtp::SmtpMailer;

use crate::config::MailConfig;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Mail delivery errors
#[derive(Error, Debug)]
pub enum MailError {
    /// Sender or recipient address did not parse
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Message could not be assembled
    #[error("Failed to build email: {0}")]
    Build(String),

    /// Transport could not be configured or refused the message
    #[error("Mail transport error: {0}")]
    Transport(String),
}

/// A rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// Plain text body
    pub text_body: String,
    /// HTML body
    pub html_body: String,
}

/// Delivers rendered mail
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Accept a message for delivery
    ///
    /// Returns once the message is accepted; implementations may finish
    /// delivery in the background.
    async fn send(&self, mail: Mail) -> Result<(), MailError>;
}

/// Pick the mailer for the given configuration
///
/// Without SMTP credentials codes are written to the log instead.
pub fn from_config(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    if config.is_configured() {
        Ok(Arc::new(SmtpMailer::new(config)?))
    } else {
        tracing::warn!("MAIL_USERNAME/MAIL_PASSWORD not set, one-time codes will be logged");
        Ok(Arc::new(ConsoleMailer))
    }
}

/// Render the one-time password email
pub fn otp_mail(to: &str, otp: &str, sender_name: &str, expires_in_minutes: i64) -> Mail {
    Mail {
        to: to.to_string(),
        subject: "Your OTP Code".to_string(),
        text_body: format!(
            "Your OTP code is: {otp}\nThis code will expire in {expires_in_minutes} minutes.\n\
             If you didn't request this code, please ignore this email.\n\n{sender_name}"
        ),
        html_body: format!(
            "<html><body>\
             <h2>Your OTP Code</h2>\
             <p>Your OTP code is: <strong>{otp}</strong></p>\
             <p>This code will expire in {expires_in_minutes} minutes.</p>\
             <p>If you didn't request this code, please ignore this email.</p>\
             <br><p>Best regards,<br>{sender_name}</p>\
             </body></html>"
        ),
    }
}

/// Render the MPIN email
pub fn mpin_mail(to: &str, mpin: &str, sender_name: &str) -> Mail {
    Mail {
        to: to.to_string(),
        subject: "Your MPIN".to_string(),
        text_body: format!(
            "Your new MPIN is: {mpin}\nUse it with your email address to sign in.\n\n{sender_name}"
        ),
        html_body: format!(
            "<html><body>\
             <h2>Your MPIN</h2>\
             <p>Your new MPIN is: <strong>{mpin}</strong></p>\
             <p>Use it with your email address to sign in.</p>\
             <br><p>Best regards,<br>{sender_name}</p>\
             </body></html>"
        ),
    }
}
