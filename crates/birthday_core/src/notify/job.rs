//! Per-run notification job resolution.
//!
//! A `NotificationJob` is built once per trigger from the user directory and
//! the subscription store, dispatched, then dropped. It is never persisted.

use crate::model::user::User;
use crate::repo::subscription_repo::{SqliteSubscriptionRepository, SubscriptionRepository};
use crate::repo::user_repo::{RepoResult, SqliteUserRepository, UserRepository};
use chrono::NaiveDate;
use rusqlite::Connection;

/// One honoree and everyone to notify about them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HonoreeBatch {
    pub honoree: User,
    pub subscribers: Vec<User>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationJob {
    /// Local date on which the trigger fired.
    pub trigger_date: NaiveDate,
    /// Local date whose birthdays are announced (`trigger_date + 1`).
    pub birthday_date: NaiveDate,
    /// Honorees in id order, including those without subscribers.
    pub batches: Vec<HonoreeBatch>,
}

impl NotificationJob {
    /// Reads honorees for `birthday_date` and resolves their subscribers.
    ///
    /// # Errors
    /// Any storage failure aborts resolution; the caller abandons the run.
    pub fn resolve(
        conn: &Connection,
        trigger_date: NaiveDate,
        birthday_date: NaiveDate,
    ) -> RepoResult<Self> {
        let users = SqliteUserRepository::new(conn);
        let subscriptions = SqliteSubscriptionRepository::new(conn);

        let mut batches = Vec::new();
        for honoree in users.users_with_birthday_on(birthday_date)? {
            let subscribers = subscriptions.list_subscribers(honoree.id)?;
            batches.push(HonoreeBatch {
                honoree,
                subscribers,
            });
        }

        Ok(Self {
            trigger_date,
            birthday_date,
            batches,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}
