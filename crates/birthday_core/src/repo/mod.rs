//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository writes validate model input before persistence.
//! - Repository APIs return semantic errors (`EmailTaken`, `UserNotFound`,
//!   `AlreadySubscribed`, `NotSubscribed`) in addition to DB transport errors.

pub mod subscription_repo;
pub mod user_repo;
