//! Request-layer facade over the birthday reminder core.
//!
//! # Responsibility
//! - Resolve the authenticated subject of a request.
//! - Call core use-cases and map their outcomes to HTTP status codes.
//!
//! # Invariants
//! - Facade functions never panic and never return `Err`; every outcome is
//!   an envelope carrying a status code and a message.
//! - The core never sees an unauthenticated request.

mod api;
mod auth;

pub use api::{
    status, ActionResponse, AvailableUserItem, AvailableUsersResponse, BirthdayApi, LoginRequest,
    RegisterRequest, SubscriptionRequest,
};
pub use auth::{Argon2CredentialHasher, AuthenticatedSubject, CredentialHasher, SessionVerifier};
