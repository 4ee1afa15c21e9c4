// ABOUTME: Outgoing mail: the Mailer seam, an SMTP implementation and a log-only fallback
// ABOUTME: Confirmation, password reset and notification digests are rendered from templates
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

//! # Email
//!
//! Handlers render an [`EmailMessage`] with [`EmailTemplates`] and hand it
//! to the configured [`Mailer`]. Without `EMAIL_HOST` the server runs with
//! [`LogMailer`], which only records the message in the log.

/// Handlebars templates for every message kind
pub mod templates;

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use recipe_core::errors::{AppError, AppResult};
use tracing::{info, warn};

pub use templates::{EmailContext, EmailKind, EmailTemplates, RecipeLink};

use crate::config::MailConfig;

/// A rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// Plain text body
    pub text: String,
    /// HTML body
    pub html: String,
}

/// Mail delivery backend
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message
    ///
    /// # Errors
    ///
    /// Returns `UNABLE_TO_SEND_EMAIL` if the message cannot be delivered
    async fn send(&self, message: EmailMessage) -> AppResult<()>;
}

/// Pick the mailer for a configuration
///
/// # Errors
///
/// Returns an error if the SMTP relay or sender address is invalid
pub fn mailer_from_config(config: &MailConfig) -> AppResult<Arc<dyn Mailer>> {
    match &config.host {
        Some(host) => {
            info!(host = %host, port = config.port, "Sending mail through SMTP relay");
            Ok(Arc::new(SmtpMailer::new(config, host)?))
        }
        None => {
            warn!("EMAIL_HOST not set, outgoing mail will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

/// SMTP delivery through `lettre`
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build a transport for `host`
    ///
    /// # Errors
    ///
    /// Returns an error if the relay cannot be configured or `EMAIL_FROM` is
    /// not a valid mailbox
    pub fn new(config: &MailConfig, host: &str) -> AppResult<Self> {
        let builder = if config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .map_err(|e| AppError::internal(format!("Invalid SMTP relay {host}: {e}")))?
        .port(config.port);

        let builder = match (&config.user, &config.password) {
            (Some(user), Some(password)) => {
                builder.credentials(Credentials::new(user.clone(), password.clone()))
            }
            _ => builder,
        };

        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| AppError::internal(format!("Invalid EMAIL_FROM address: {e}")))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[tracing::instrument(skip(self, message), fields(to = %message.to, subject = %message.subject))]
    async fn send(&self, message: EmailMessage) -> AppResult<()> {
        let to = message
            .to
            .parse::<Mailbox>()
            .map_err(|e| AppError::unable_to_send_email(format!("Invalid recipient: {e}")))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject)
            .multipart(MultiPart::alternative_plain_html(message.text, message.html))
            .map_err(|e| AppError::unable_to_send_email(format!("Failed to build message: {e}")))?;

        self.transport.send(email).await.map_err(|e| {
            AppError::unable_to_send_email(format!("SMTP delivery failed: {e}")).with_source(e)
        })?;

        info!("Mail sent");
        Ok(())
    }
}

/// Mailer that only logs what would have been sent
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> AppResult<()> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.text,
            "Mail delivery disabled, message logged only"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_mailer_accepts_messages() {
        let mailer = mailer_from_config(&MailConfig::default()).unwrap();
        let message = EmailMessage {
            to: "someone@example.com".into(),
            subject: "Hello".into(),
            text: "text".into(),
            html: "<p>html</p>".into(),
        };
        assert!(mailer.send(message).await.is_ok());
    }

    #[test]
    fn test_invalid_sender_is_rejected() {
        let config = MailConfig {
            host: Some("localhost".into()),
            from: "not an address".into(),
            ..MailConfig::default()
        };
        assert!(SmtpMailer::new(&config, "localhost").is_err());
    }
}
