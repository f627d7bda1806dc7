use std::sync::Arc;

use log::{info, warn};

use super::session::ConnectionRecord;
use crate::capture::AuditLog;
use crate::error_handling::types::SessionError;

/// Receives every fully authenticated connection.
///
/// `C` is the live connection handle of the transport in use. Implementors
/// own the interactive phase from here on; returning an error closes the
/// connection.
pub trait SessionDispatcher<C>: Send + Sync {
    fn dispatch(&self, connection: C, record: ConnectionRecord) -> Result<(), SessionError>;
}

/// Dispatcher used when no interactive shell is plugged in.
///
/// It appends a login line to the audit log and releases the connection
/// handle; the client stays connected until it leaves or the transport's
/// inactivity timeout closes it.
pub struct AuditDispatcher {
    audit_log: Arc<AuditLog>,
}

impl AuditDispatcher {
    pub fn new(audit_log: Arc<AuditLog>) -> Self {
        Self { audit_log }
    }
}

impl<C: Send> SessionDispatcher<C> for AuditDispatcher {
    fn dispatch(&self, _connection: C, record: ConnectionRecord) -> Result<(), SessionError> {
        info!(
            "[{}] login {} -> {} as {:?}",
            record.id, record.source, record.destination, record.user
        );
        let line = format!(
            "login {} -> {} {}:{}",
            record.source, record.destination, record.user, record.pass
        );
        if let Err(e) = self.audit_log.append(&line) {
            warn!("[{}] Failed to write login line: {}", record.id, e);
        }
        Ok(())
    }
}
