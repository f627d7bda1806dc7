//! Activity store trait
//!
//! This module defines the `ActivityStore` trait, the interface the delivery
//! worker uses to persist captured attempts.
//!
//! The worker is the only caller of a store, from a single task, so methods
//! take `&mut self` and implementors need no internal locking. Both
//! operations must be safe to call again after a failure: the worker
//! retries writes and logins without any other coordination.

use std::future::Future;

use crate::capture::Attempt;
use crate::error_handling::types::StorageError;

pub trait ActivityStore: Send {
    /// (Re)establishes the connection to the backend.
    ///
    /// Returns `StorageError::ConnectionFailed` when the backend cannot be
    /// reached.
    fn login(&mut self) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Persists one attempt.
    ///
    /// Returns an error when there is no live connection or when the backend
    /// refused the write; the attempt is then considered not written.
    fn write_attempt(
        &mut self,
        attempt: &Attempt,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}
