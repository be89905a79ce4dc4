//! Per-honoree reminder fan-out.
//!
//! # Responsibility
//! - Compose the reminder for each subscriber of one honoree.
//! - Deliver through the injected transport with a per-call timeout.
//! - Report every outcome without raising for the whole call.
//!
//! # Invariants
//! - Sends are serialized; no outbound session is shared by concurrent calls.
//! - An empty subscriber set performs no transport calls.

use crate::model::user::{User, UserId};
use crate::notify::transport::{MailMessage, MailTransport, TransportError};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

pub const REMINDER_SUBJECT: &str = "Happy Birthday Notification";

/// Builds the reminder sent to `subscriber` about `honoree`.
pub fn reminder_message(honoree: &User, subscriber: &User) -> MailMessage {
    MailMessage {
        to: subscriber.email.clone(),
        subject: REMINDER_SUBJECT.to_string(),
        body: format!(
            "Tomorrow is {}'s birthday! Don't forget to congratulate them!",
            honoree.name
        ),
    }
}

/// One subscriber the reminder could not reach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub subscriber_id: UserId,
    pub email: String,
    pub error: TransportError,
}

/// Outcome of one `notify_honoree` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub honoree_id: UserId,
    /// Subscribers whose transport call succeeded, in send order.
    pub delivered: Vec<UserId>,
    pub failures: Vec<DeliveryFailure>,
}

impl DispatchReport {
    fn new(honoree_id: UserId) -> Self {
        Self {
            honoree_id,
            delivered: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn attempts(&self) -> usize {
        self.delivered.len() + self.failures.len()
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }
}

/// Sends reminders through a mail transport.
pub struct NotificationDispatcher {
    transport: Arc<dyn MailTransport>,
    send_timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(transport: Arc<dyn MailTransport>, send_timeout: Duration) -> Self {
        Self {
            transport,
            send_timeout,
        }
    }

    /// Delivers one reminder per subscriber and reports each outcome.
    ///
    /// Failures (including timeouts) are logged and recorded; the remaining
    /// subscribers are still attempted.
    pub async fn notify_honoree(&self, honoree: &User, subscribers: &[User]) -> DispatchReport {
        let mut report = DispatchReport::new(honoree.id);

        for subscriber in subscribers {
            let message = reminder_message(honoree, subscriber);
            match self.deliver(&message).await {
                Ok(()) => {
                    info!(
                        "event=reminder_send module=notify status=ok honoree_id={} subscriber_id={}",
                        honoree.id, subscriber.id
                    );
                    report.delivered.push(subscriber.id);
                }
                Err(error) => {
                    warn!(
                        "event=reminder_send module=notify status=error honoree_id={} subscriber_id={} error={}",
                        honoree.id, subscriber.id, error
                    );
                    report.failures.push(DeliveryFailure {
                        subscriber_id: subscriber.id,
                        email: subscriber.email.clone(),
                        error,
                    });
                }
            }
        }

        report
    }

    async fn deliver(&self, message: &MailMessage) -> Result<(), TransportError> {
        match tokio::time::timeout(self.send_timeout, self.transport.send(message)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.send_timeout)),
        }
    }
}
