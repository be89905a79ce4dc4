//! Mail transport contract and SMTP implementation.
//!
//! # Responsibility
//! - Define the `(to, subject, body)` delivery contract used by the
//!   dispatcher.
//! - Provide the SMTP (STARTTLS relay) transport used in production.

use async_trait::async_trait;
use lettre::address::AddressError;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// One outbound plain-text email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivery failure for a single message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Sender or recipient address could not be parsed.
    InvalidAddress(String),
    /// Message could not be assembled.
    Message(String),
    /// Server unreachable or message rejected.
    Delivery(String),
    /// No answer within the per-call timeout.
    Timeout(Duration),
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAddress(value) => write!(f, "invalid mail address: {value}"),
            Self::Message(message) => write!(f, "cannot build mail message: {message}"),
            Self::Delivery(message) => write!(f, "mail delivery failed: {message}"),
            Self::Timeout(limit) => {
                write!(f, "mail delivery timed out after {} ms", limit.as_millis())
            }
        }
    }
}

impl Error for TransportError {}

/// Outbound mail capability injected into the dispatcher.
///
/// Implementations must be safe to call from any task; the dispatcher wraps
/// every call in its own timeout.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), TransportError>;
}

/// SMTP relay connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Sender address; falls back to `username` when unset.
    pub from: Option<String>,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: "smtp.mail.ru".to_string(),
            port: 587,
            username: String::new(),
            password: String::new(),
            from: None,
        }
    }
}

/// STARTTLS SMTP transport.
pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailTransport {
    /// Builds the relay client. No connection is opened until the first send.
    ///
    /// # Errors
    /// - `InvalidAddress` when the sender address cannot be parsed.
    /// - `Delivery` when the relay host is rejected by the TLS setup.
    pub fn new(settings: &SmtpSettings, timeout: Duration) -> Result<Self, TransportError> {
        let from_address = settings.from.as_deref().unwrap_or(settings.username.as_str());
        let from = parse_mailbox(from_address)?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|err| TransportError::Delivery(err.to_string()))?
            .port(settings.port)
            .timeout(Some(timeout));
        if !settings.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, message: &MailMessage) -> Result<(), TransportError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(&message.to)?)
            .subject(message.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|err| TransportError::Message(err.to_string()))?;

        self.transport
            .send(email)
            .await
            .map(|_| ())
            .map_err(|err| TransportError::Delivery(err.to_string()))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, TransportError> {
    address
        .trim()
        .parse()
        .map_err(|err: AddressError| TransportError::InvalidAddress(format!("`{address}`: {err}")))
}
