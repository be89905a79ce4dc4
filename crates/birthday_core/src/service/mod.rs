//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Emit the diagnostic events for each mutation.
//! - Keep request/API layers decoupled from storage details.

pub mod subscription_service;
pub mod user_service;
