//! SMTP delivery
//!
//! Messages are validated and assembled on the caller's task, then handed to
//! a spawned task for the network round trip so the HTTP response does not
//! wait on the mail server.

use super::{Mail, MailError, Mailer};
use crate::config::MailConfig;
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, info};

/// Sends mail through an SMTP relay
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpMailer {
    /// Build a transport from configuration
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let builder = if config.ssl_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.server)
                .map_err(|e| MailError::Transport(e.to_string()))?
        } else if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
                .map_err(|e| MailError::Transport(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.server)
        };

        let mut builder = builder.port(config.port);
        if config.use_credentials {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        let address: Address = config
            .from
            .parse()
            .map_err(|_| MailError::InvalidAddress(config.from.clone()))?;
        let sender = Mailbox::new(Some(config.from_name.clone()), address);

        Ok(Self {
            transport: builder.build(),
            sender,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: Mail) -> Result<(), MailError> {
        let recipient: Mailbox = mail
            .to
            .parse()
            .map_err(|_| MailError::InvalidAddress(mail.to.clone()))?;

        let message = Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .subject(mail.subject)
            .multipart(MultiPart::alternative_plain_html(
                mail.text_body,
                mail.html_body,
            ))
            .map_err(|e| MailError::Build(e.to_string()))?;

        let transport = self.transport.clone();
        let to = mail.to;
        tokio::spawn(async move {
            match transport.send(message).await {
                Ok(_) => info!(to = %to, "Email sent"),
                Err(e) => error!(to = %to, error = %e, "Failed to send email"),
            }
        });

        Ok(())
    }
}
