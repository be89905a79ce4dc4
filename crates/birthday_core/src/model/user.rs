//! User domain model.
//!
//! # Responsibility
//! - Define the read model shared by directory lookups and listings.
//! - Validate registration input before it reaches storage.
//!
//! # Invariants
//! - `id` is assigned by storage and never reused.
//! - Password hashes never appear in the `User` read model.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Stable numeric identifier assigned at registration.
pub type UserId = i64;

/// Registered user as seen by the directory and the notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Display name used in reminder messages.
    pub name: String,
    /// Unique delivery address.
    pub email: String,
    /// Only month and day take part in birthday matching.
    pub date_of_birth: NaiveDate,
}

/// Registration input.
///
/// `password_hash` is produced by the credential layer; the core stores it
/// verbatim and never interprets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub date_of_birth: NaiveDate,
}

/// Stored login material returned by email lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredentials {
    pub user: User,
    pub password_hash: String,
}

/// Validation failures for registration input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    EmptyName,
    InvalidEmail(String),
    EmptyPasswordHash,
    /// Birth year outside `0..=9999`; stored dates are `YYYY-MM-DD`.
    YearOutOfRange(i32),
}

impl Display for UserValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "user name cannot be empty"),
            Self::InvalidEmail(value) => write!(f, "invalid email address: `{value}`"),
            Self::EmptyPasswordHash => write!(f, "password hash cannot be empty"),
            Self::YearOutOfRange(year) => {
                write!(f, "birth year {year} is outside 0..=9999")
            }
        }
    }
}

impl Error for UserValidationError {}

impl NewUser {
    /// Normalizes whitespace and email case in place.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.email = normalize_email(&self.email);
        self
    }

    /// Checks registration invariants.
    ///
    /// # Errors
    /// - `EmptyName` when the trimmed name is empty.
    /// - `InvalidEmail` when the address does not look like `local@domain.tld`.
    /// - `EmptyPasswordHash` when no hash was supplied.
    /// - `YearOutOfRange` when the date of birth has no four-digit year.
    pub fn validate(&self) -> Result<(), UserValidationError> {
        if self.name.trim().is_empty() {
            return Err(UserValidationError::EmptyName);
        }
        if !EMAIL_RE.is_match(self.email.trim()) {
            return Err(UserValidationError::InvalidEmail(self.email.clone()));
        }
        if self.password_hash.is_empty() {
            return Err(UserValidationError::EmptyPasswordHash);
        }
        let year = self.date_of_birth.year();
        if !(0..=9999).contains(&year) {
            return Err(UserValidationError::YearOutOfRange(year));
        }
        Ok(())
    }
}

/// Lowercases and trims an email address for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
