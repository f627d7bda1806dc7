//! Post-handshake connection handling.
//!
//! Once the SSH layer reports a granted authentication, the finalizer turns
//! the credential pair carried on the result into a `ConnectionRecord` and
//! hands it, together with the live connection, to a `SessionDispatcher`.
//! What the dispatcher does with the interactive phase is outside this
//! crate's concern.

/// Submodule for the per-connection record.
pub mod session;
/// Submodule for the credential handoff check.
pub mod connection_finalizer;
/// Submodule for dispatcher implementations.
pub mod dispatcher;

pub use connection_finalizer::ConnectionFinalizer;
pub use dispatcher::{AuditDispatcher, SessionDispatcher};
pub use session::ConnectionRecord;
