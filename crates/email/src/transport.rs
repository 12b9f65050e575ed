// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Email delivery backends

use std::num::NonZeroU16;

use async_trait::async_trait;
use lettre::{
    AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::{AsyncSmtpTransport, authentication::Credentials},
};
use thiserror::Error;

/// Free-form data attached to an email, forwarded to the backend
pub type TemplateData = serde_json::Map<String, serde_json::Value>;

/// Encryption mode to use
#[derive(Debug, Clone, Copy)]
pub enum SmtpMode {
    /// Plain text
    Plain,
    /// `StartTLS` (starts as plain text then upgrade to TLS)
    StartTls,
    /// TLS
    Tls,
}

/// A backend failed to deliver an email
///
/// The underlying error is kept as-is and never interpreted.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct TransportError(Box<dyn std::error::Error + Send + Sync + 'static>);

impl TransportError {
    /// Wrap a backend error
    pub fn new(error: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        Self(error.into())
    }
}

/// Something able to deliver a rendered email
#[async_trait]
pub trait DeliveryBackend: Send + Sync {
    /// Deliver one email. This makes exactly one attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the email could not be delivered
    async fn send(
        &self,
        to: &Mailbox,
        subject: &str,
        body: &str,
        metadata: &TemplateData,
    ) -> Result<(), TransportError>;

    /// Check that the backend is reachable
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is not reachable
    async fn test_connection(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Delivers emails to an SMTP server
#[derive(Clone)]
pub struct SmtpTransport {
    inner: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpTransport {
    /// Construct a SMTP transport
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying SMTP transport could not be built
    pub fn new(
        mode: SmtpMode,
        hostname: &str,
        port: Option<NonZeroU16>,
        credentials: Option<Credentials>,
        from: Mailbox,
    ) -> Result<Self, lettre::transport::smtp::Error> {
        let mut t = match mode {
            SmtpMode::Plain => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(hostname),
            SmtpMode::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(hostname)?,
            SmtpMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(hostname)?,
        };

        if let Some(credentials) = credentials {
            t = t.credentials(credentials);
        }

        if let Some(port) = port {
            t = t.port(port.into());
        }

        Ok(Self {
            inner: t.build(),
            from,
        })
    }
}

#[async_trait]
impl DeliveryBackend for SmtpTransport {
    #[tracing::instrument(
        name = "email.transport.smtp.send",
        skip_all,
        fields(email.to = %to),
    )]
    async fn send(
        &self,
        to: &Mailbox,
        subject: &str,
        body: &str,
        metadata: &TemplateData,
    ) -> Result<(), TransportError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.clone())
            .subject(subject)
            // By passing `None`, lettre generates a random message ID
            // with a random UUID and the hostname for us
            .message_id(None)
            .header(ContentType::TEXT_HTML)
            .body(body.to_owned())
            .map_err(TransportError::new)?;

        self.inner
            .send(message)
            .await
            .map_err(TransportError::new)?;

        tracing::debug!(
            metadata = ?metadata.keys().collect::<Vec<_>>(),
            "Email handed to the SMTP server"
        );

        Ok(())
    }

    async fn test_connection(&self) -> Result<(), TransportError> {
        let connected = self
            .inner
            .test_connection()
            .await
            .map_err(TransportError::new)?;

        if !connected {
            return Err(TransportError::new("the SMTP server refused the connection"));
        }

        Ok(())
    }
}
