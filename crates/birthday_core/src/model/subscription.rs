//! Subscription edge model.
//!
//! # Invariants
//! - An edge is directed: `subscriber_id` follows `honoree_id`.
//! - Self-edges are invalid.

use crate::model::user::UserId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One subscriber→honoree edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subscription {
    /// User who receives the reminder.
    pub subscriber_id: UserId,
    /// User whose birthday is announced.
    pub honoree_id: UserId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionValidationError {
    SelfSubscription(UserId),
}

impl Display for SubscriptionValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelfSubscription(id) => write!(f, "user {id} cannot subscribe to themselves"),
        }
    }
}

impl Error for SubscriptionValidationError {}

impl Subscription {
    pub fn new(subscriber_id: UserId, honoree_id: UserId) -> Self {
        Self {
            subscriber_id,
            honoree_id,
        }
    }

    pub fn validate(&self) -> Result<(), SubscriptionValidationError> {
        if self.subscriber_id == self.honoree_id {
            return Err(SubscriptionValidationError::SelfSubscription(
                self.subscriber_id,
            ));
        }
        Ok(())
    }
}

impl Display for Subscription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{}", self.subscriber_id, self.honoree_id)
    }
}
