//! Credential capture.
//!
//! Everything that runs inside a connection's authentication phase lives
//! here: the gate that grants every password, the audit log it writes to,
//! and the bounded queue it publishes captured attempts on.
//!
//! Components:
//! - `types`: `Attempt`, `Credentials` and the `Permissions` a grant carries.
//! - `audit_log`: append-only local text log, one line per attempt.
//! - `attempt_queue`: bounded FIFO between the gate and the delivery worker.
//! - `auth_gate`: the always-grant password callback.

pub mod attempt_queue;
pub mod audit_log;
pub mod auth_gate;
pub mod types;

pub use attempt_queue::{attempt_queue, AttemptReceiver, AttemptSender};
pub use audit_log::AuditLog;
pub use auth_gate::{AuthGate, CaptureContext};
pub use types::{Attempt, Credentials, Permissions};
