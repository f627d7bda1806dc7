//! # Controller Module
//!
//! Builds every component from a [`Config`](crate::configuration::Config),
//! wires them together and owns their lifetime.
//!
//! ```text
//! NetworkListener ──▶ AuthGate ──▶ AttemptQueue ──▶ DeliveryWorker ──▶ ActivityStore
//!        │
//!        └──▶ ConnectionFinalizer ──▶ SessionDispatcher
//! ```
//!
//! Startup problems (unreadable host key, audit log that cannot be opened,
//! port that cannot be bound) are fatal. An unreachable activity store is
//! not: attempts are buffered until it answers.

pub mod controller_handler;

pub use controller_handler::{Controller, RunningHoneypot};
