//! Domain model for users, subscription edges and birthday matching.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep validation next to the types it protects.
//!
//! # Invariants
//! - Every user is identified by a stable numeric `UserId`.
//! - A subscription edge never points from a user to itself.

pub mod birthday;
pub mod subscription;
pub mod user;
