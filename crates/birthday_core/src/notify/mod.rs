//! Birthday notification pipeline.
//!
//! # Responsibility
//! - Deliver reminder messages through an injected mail transport.
//! - Resolve each day's honorees and their subscribers.
//! - Drive the pipeline from a daily trigger in a fixed time zone.
//!
//! # Invariants
//! - Delivery is best-effort and at-most-once per run; nothing is retried.
//! - One recipient's failure never aborts delivery to anyone else.
//! - One run's failure never stops the trigger loop.

pub mod dispatcher;
pub mod job;
pub mod scheduler;
pub mod transport;
