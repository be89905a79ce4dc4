//! Subscription store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Create and remove subscriber→honoree edges.
//! - Answer the two read questions the rest of the system asks: "whom could
//!   this user follow" and "who follows this honoree".
//!
//! # Invariants
//! - At most one edge per ordered pair. The existence check and the insert
//!   run in one IMMEDIATE transaction and the insert itself is
//!   `ON CONFLICT DO NOTHING`, so concurrent duplicates cannot both land.
//! - Both endpoints exist when an edge is written.
//! - Rejected mutations write nothing.

use crate::db::DbError;
use crate::model::subscription::{Subscription, SubscriptionValidationError};
use crate::model::user::{User, UserId};
use crate::repo::user_repo::{parse_user_row, user_exists, RepoResult};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SubscriptionResult<T> = Result<T, SubscriptionError>;

/// Errors from subscribe/unsubscribe mutations.
#[derive(Debug)]
pub enum SubscriptionError {
    /// Edge input is invalid (self-subscription).
    Validation(SubscriptionValidationError),
    /// One endpoint does not reference a registered user.
    UserNotFound(UserId),
    /// The edge already exists; nothing was written.
    AlreadySubscribed(Subscription),
    /// The edge does not exist; nothing was deleted.
    NotSubscribed(Subscription),
    /// Storage could not complete the operation.
    StoreUnavailable(DbError),
}

impl SubscriptionError {
    /// Returns whether the caller, not the server, caused the failure.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::StoreUnavailable(_))
    }
}

impl Display for SubscriptionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::AlreadySubscribed(edge) => write!(f, "subscription already exists: {edge}"),
            Self::NotSubscribed(edge) => write!(f, "subscription does not exist: {edge}"),
            Self::StoreUnavailable(err) => write!(f, "subscription store unavailable: {err}"),
        }
    }
}

impl Error for SubscriptionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::StoreUnavailable(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SubscriptionValidationError> for SubscriptionError {
    fn from(value: SubscriptionValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<rusqlite::Error> for SubscriptionError {
    fn from(value: rusqlite::Error) -> Self {
        Self::StoreUnavailable(DbError::Sqlite(value))
    }
}

/// Repository interface for the subscription store.
pub trait SubscriptionRepository {
    fn subscribe(&self, edge: Subscription) -> SubscriptionResult<()>;
    fn unsubscribe(&self, edge: Subscription) -> SubscriptionResult<()>;
    /// Every user except `user_id` and the users it already follows.
    fn list_available_for_subscription(&self, user_id: UserId) -> RepoResult<Vec<User>>;
    /// Every user holding an edge towards `honoree_id`.
    fn list_subscribers(&self, honoree_id: UserId) -> RepoResult<Vec<User>>;
}

/// SQLite-backed subscription store.
pub struct SqliteSubscriptionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSubscriptionRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SubscriptionRepository for SqliteSubscriptionRepository<'_> {
    fn subscribe(&self, edge: Subscription) -> SubscriptionResult<()> {
        edge.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for id in [edge.subscriber_id, edge.honoree_id] {
            if !user_exists(&tx, id)? {
                return Err(SubscriptionError::UserNotFound(id));
            }
        }

        let inserted = tx.execute(
            "INSERT INTO subscriptions (user_id, related_user_id)
             VALUES (?1, ?2)
             ON CONFLICT (user_id, related_user_id) DO NOTHING;",
            params![edge.subscriber_id, edge.honoree_id],
        )?;
        if inserted == 0 {
            return Err(SubscriptionError::AlreadySubscribed(edge));
        }

        tx.commit()?;
        Ok(())
    }

    fn unsubscribe(&self, edge: Subscription) -> SubscriptionResult<()> {
        let deleted = self.conn.execute(
            "DELETE FROM subscriptions
             WHERE user_id = ?1
               AND related_user_id = ?2;",
            params![edge.subscriber_id, edge.honoree_id],
        )?;
        if deleted == 0 {
            return Err(SubscriptionError::NotSubscribed(edge));
        }
        Ok(())
    }

    fn list_available_for_subscription(&self, user_id: UserId) -> RepoResult<Vec<User>> {
        query_users(
            self.conn,
            "SELECT u.id, u.name, u.email, u.date_of_birth
             FROM users u
             WHERE u.id <> ?1
               AND NOT EXISTS (
                 SELECT 1
                 FROM subscriptions s
                 WHERE s.user_id = ?1
                   AND s.related_user_id = u.id
               )
             ORDER BY u.id ASC;",
            user_id,
        )
    }

    fn list_subscribers(&self, honoree_id: UserId) -> RepoResult<Vec<User>> {
        query_users(
            self.conn,
            "SELECT u.id, u.name, u.email, u.date_of_birth
             FROM subscriptions s
             INNER JOIN users u ON u.id = s.user_id
             WHERE s.related_user_id = ?1
             ORDER BY u.id ASC;",
            honoree_id,
        )
    }
}

fn query_users(conn: &Connection, sql: &str, id: UserId) -> RepoResult<Vec<User>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([id], parse_user_row)?;
    let mut users = Vec::new();
    for user in rows {
        users.push(user?);
    }
    Ok(users)
}
