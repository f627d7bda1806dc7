use log::{debug, error};
use uuid::Uuid;

use super::dispatcher::SessionDispatcher;
use super::session::ConnectionRecord;
use crate::capture::Permissions;
use crate::error_handling::types::SessionError;

/// Turns a granted authentication into a dispatched session.
///
/// The auth gate always attaches the offered credentials to the permissions
/// it grants, but the finalizer still checks that they made it through the
/// handshake. A connection without them is refused with
/// [`SessionError::MalformedCredentialHandoff`]; other connections are not
/// affected.
pub struct ConnectionFinalizer<D> {
    dispatcher: D,
}

impl<D> ConnectionFinalizer<D> {
    pub fn new(dispatcher: D) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Validates the handoff, builds the connection record and dispatches.
    ///
    /// * `id` - connection id used in log lines and the record
    /// * `connection` - live connection handed to the dispatcher
    /// * `permissions` - what the password callback granted, if anything
    /// * `source` / `destination` - remote and local endpoint strings
    pub fn finalize<C>(
        &self,
        id: Uuid,
        connection: C,
        permissions: Option<Permissions>,
        source: &str,
        destination: &str,
    ) -> Result<ConnectionRecord, SessionError>
    where
        D: SessionDispatcher<C>,
    {
        let Some(permissions) = permissions else {
            error!("[{}] Authentication result from {} carries no credentials", id, source);
            return Err(SessionError::MalformedCredentialHandoff);
        };

        let credentials = permissions.credentials;
        let record = ConnectionRecord::new(
            id,
            source,
            destination,
            credentials.username,
            credentials.password,
        );
        debug!("[{}] Dispatching session for {}", id, source);
        self.dispatcher.dispatch(connection, record.clone())?;
        Ok(record)
    }
}
