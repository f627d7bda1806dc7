//! Delivery of captured attempts to the activity store.
//!
//! Components:
//! - `backlog`: ordered buffer of attempts the store has not accepted yet.
//! - `backoff`: pluggable pause taken when the store stays unreachable.
//! - `delivery_worker`: the single task draining the attempt queue.

pub mod backlog;
pub mod backoff;
pub mod delivery_worker;

pub use backlog::Backlog;
pub use backoff::{Backoff, ConstantBackoff, DEFAULT_RETRY_INTERVAL};
pub use delivery_worker::{DeliveryOutcome, DeliveryStats, DeliveryWorker};
