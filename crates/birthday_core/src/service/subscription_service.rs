//! Subscription use-case service.
//!
//! # Responsibility
//! - Provide subscribe/unsubscribe/listing entry points for the API layer.
//! - Log client-attributable rejections below `error` level.
//!
//! # Invariants
//! - The subscriber id is trusted as handed over by the session layer.
//! - Mutation failures propagate unchanged to the caller.

use crate::model::subscription::Subscription;
use crate::model::user::{User, UserId};
use crate::repo::subscription_repo::{SubscriptionRepository, SubscriptionResult};
use crate::repo::user_repo::RepoResult;
use log::{error, info, warn};

/// Use-case service wrapper for the subscription store.
pub struct SubscriptionService<R: SubscriptionRepository> {
    repo: R,
}

impl<R: SubscriptionRepository> SubscriptionService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates the edge `subscriber_id -> honoree_id`.
    ///
    /// # Errors
    /// - `Validation` for a self-subscription.
    /// - `UserNotFound` when either endpoint is unknown.
    /// - `AlreadySubscribed` when the edge exists.
    /// - `StoreUnavailable` on storage failure.
    pub fn subscribe(&self, subscriber_id: UserId, honoree_id: UserId) -> SubscriptionResult<()> {
        let edge = Subscription::new(subscriber_id, honoree_id);
        let result = self.repo.subscribe(edge);
        log_mutation("subscribe", edge, &result);
        result
    }

    /// Removes the edge `subscriber_id -> honoree_id`.
    ///
    /// # Errors
    /// - `NotSubscribed` when there is no such edge.
    /// - `StoreUnavailable` on storage failure.
    pub fn unsubscribe(&self, subscriber_id: UserId, honoree_id: UserId) -> SubscriptionResult<()> {
        let edge = Subscription::new(subscriber_id, honoree_id);
        let result = self.repo.unsubscribe(edge);
        log_mutation("unsubscribe", edge, &result);
        result
    }

    /// Lists users `user_id` could start following.
    pub fn list_available(&self, user_id: UserId) -> RepoResult<Vec<User>> {
        self.repo.list_available_for_subscription(user_id)
    }

    /// Lists everyone following `honoree_id`.
    pub fn list_subscribers(&self, honoree_id: UserId) -> RepoResult<Vec<User>> {
        self.repo.list_subscribers(honoree_id)
    }
}

fn log_mutation(event: &str, edge: Subscription, result: &SubscriptionResult<()>) {
    match result {
        Ok(()) => info!(
            "event={event} module=subscription status=ok subscriber_id={} honoree_id={}",
            edge.subscriber_id, edge.honoree_id
        ),
        Err(err) if err.is_client_error() => warn!(
            "event={event} module=subscription status=rejected subscriber_id={} honoree_id={} reason={}",
            edge.subscriber_id, edge.honoree_id, err
        ),
        Err(err) => error!(
            "event={event} module=subscription status=error subscriber_id={} honoree_id={} error={}",
            edge.subscriber_id, edge.honoree_id, err
        ),
    }
}
