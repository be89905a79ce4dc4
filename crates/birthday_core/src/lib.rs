//! Core domain logic for the birthday reminder service.
//! This crate is the single source of truth for subscription invariants and
//! for the daily reminder pipeline.

pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, share_connection, DbError, SharedConnection};
pub use logging::{default_log_level, init_logging, logging_status, LogSettings};
pub use model::subscription::{Subscription, SubscriptionValidationError};
pub use model::user::{NewUser, StoredCredentials, User, UserId, UserValidationError};
pub use notify::dispatcher::{
    reminder_message, DeliveryFailure, DispatchReport, NotificationDispatcher, REMINDER_SUBJECT,
};
pub use notify::job::{HonoreeBatch, NotificationJob};
pub use notify::scheduler::{
    next_trigger_after, BirthdayScheduler, RunError, RunReport, ScheduleConfig,
    ScheduleConfigError, SchedulerHandle, SchedulerState,
};
pub use notify::transport::{
    MailMessage, MailTransport, SmtpMailTransport, SmtpSettings, TransportError,
};
pub use repo::subscription_repo::{
    SqliteSubscriptionRepository, SubscriptionError, SubscriptionRepository, SubscriptionResult,
};
pub use repo::user_repo::{RepoError, RepoResult, SqliteUserRepository, UserRepository};
pub use service::subscription_service::SubscriptionService;
pub use service::user_service::UserService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
