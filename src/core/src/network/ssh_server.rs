use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use russh::keys::PrivateKey;
use russh::server::{self, Auth, Msg, Session};
use russh::{Channel, MethodKind, MethodSet, SshId};
use uuid::Uuid;

use crate::capture::{AuthGate, Permissions};
use crate::error_handling::types::{NetworkError, SessionError};
use crate::session_management::{ConnectionFinalizer, ConnectionRecord, SessionDispatcher};

/// Loads the OpenSSH private key used as the server identity.
pub fn load_host_key(path: &Path) -> Result<PrivateKey, NetworkError> {
    let key = russh::keys::load_secret_key(path, None)
        .map_err(|e| NetworkError::HostKeyError(format!("{}: {}", path.display(), e)))?;
    info!("Host key loaded from {}", path.display());
    Ok(key)
}

/// Server configuration offering password authentication only.
pub fn server_config(
    host_key: PrivateKey,
    version_banner: &str,
    inactivity_timeout: Option<Duration>,
) -> server::Config {
    server::Config {
        server_id: SshId::Standard(version_banner.to_string()),
        methods: MethodSet::from(&[MethodKind::Password][..]),
        auth_rejection_time: Duration::from_secs(1),
        auth_rejection_time_initial: Some(Duration::from_secs(0)),
        inactivity_timeout,
        keys: vec![host_key],
        ..Default::default()
    }
}

/// Per-connection russh handler.
///
/// Password authentication goes through the [`AuthGate`]; once russh reports
/// the authentication as successful the granted permissions are handed to
/// the [`ConnectionFinalizer`]. Session channels are only accepted after a
/// successful finalize.
pub struct HoneypotHandler<D> {
    id: Uuid,
    peer_addr: SocketAddr,
    local_addr: SocketAddr,
    gate: AuthGate,
    finalizer: Arc<ConnectionFinalizer<D>>,
    permissions: Option<Permissions>,
    record: Option<ConnectionRecord>,
}

impl<D> HoneypotHandler<D> {
    pub fn new(
        peer_addr: SocketAddr,
        local_addr: SocketAddr,
        gate: AuthGate,
        finalizer: Arc<ConnectionFinalizer<D>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer_addr,
            local_addr,
            gate,
            finalizer,
            permissions: None,
            record: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl<D> server::Handler for HoneypotHandler<D>
where
    D: SessionDispatcher<server::Handle> + 'static,
{
    type Error = SessionError;

    async fn auth_password(&mut self, user: &str, password: &str) -> Result<Auth, Self::Error> {
        let remote = self.peer_addr.to_string();
        let permissions = self.gate.authenticate(&remote, user, password).await;
        self.permissions = Some(permissions);
        Ok(Auth::Accept)
    }

    async fn auth_succeeded(&mut self, session: &mut Session) -> Result<(), Self::Error> {
        let source = self.peer_addr.to_string();
        let destination = self.local_addr.to_string();
        match self.finalizer.finalize(
            self.id,
            session.handle(),
            self.permissions.take(),
            &source,
            &destination,
        ) {
            Ok(record) => {
                self.record = Some(record);
                Ok(())
            }
            Err(e) => {
                error!("[{}] Closing connection from {}: {}", self.id, source, e);
                Err(e)
            }
        }
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        debug!("[{}] Session channel {} requested", self.id, channel.id());
        Ok(self.record.is_some())
    }
}
