//! # Network Listener Module
//!
//! Accepts TCP connections on the configured address and runs one SSH
//! session task per connection.
//!
//! ```text
//! ┌─────────────┐    ┌─────────────────┐    ┌──────────────────┐
//! │ Incoming    │───▶│ NetworkListener │───▶│ HoneypotHandler  │
//! │ Connections │    │ (accept loop)   │    │ (task per conn)  │
//! └─────────────┘    └─────────────────┘    └──────────────────┘
//! ```
//!
//! There is no cap on concurrent connections. Every connection task keeps a
//! clone of the shutdown signal and disconnects its client once the signal
//! fires; the accept loop stops accepting at the same moment.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use russh::server;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use uuid::Uuid;

use super::ssh_server::HoneypotHandler;
use crate::capture::AuthGate;
use crate::error_handling::types::{NetworkError, SessionError};
use crate::session_management::{ConnectionFinalizer, SessionDispatcher};

/// How long a connection gets to say goodbye once shutdown fires.
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

pub struct NetworkListener<D> {
    listener: TcpListener,
    config: Arc<server::Config>,
    gate: AuthGate,
    finalizer: Arc<ConnectionFinalizer<D>>,
}

impl<D> NetworkListener<D>
where
    D: SessionDispatcher<server::Handle> + 'static,
{
    /// Binds the listening socket.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::BindError` when the address is in use or the
    /// process lacks the privilege to bind it (ports < 1024).
    pub async fn bind(
        addr: SocketAddr,
        config: Arc<server::Config>,
        gate: AuthGate,
        finalizer: Arc<ConnectionFinalizer<D>>,
    ) -> Result<Self, NetworkError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(NetworkError::BindError)?;
        info!("Listening on {}", addr);
        Ok(Self {
            listener,
            config,
            gate,
            finalizer,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, NetworkError> {
        self.listener.local_addr().map_err(NetworkError::SockError)
    }

    /// Accepts connections until `shutdown` fires.
    ///
    /// Accept errors are logged and the loop continues.
    pub async fn serve(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            let (stream, peer_addr) = tokio::select! {
                _ = shutdown.changed() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!("Accept failed: {}", e);
                        continue;
                    }
                },
            };
            self.spawn_connection(stream, peer_addr, shutdown.clone());
        }
        info!("Listener stopped accepting connections");
    }

    fn spawn_connection(
        &self,
        stream: TcpStream,
        peer_addr: SocketAddr,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let local_addr = match stream.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                warn!("Dropping connection from {}: {}", peer_addr, e);
                return;
            }
        };

        let handler = HoneypotHandler::new(
            peer_addr,
            local_addr,
            self.gate.clone(),
            Arc::clone(&self.finalizer),
        );
        let id = handler.id();
        let config = Arc::clone(&self.config);

        tokio::spawn(async move {
            debug!("[{}] Connection from {}", id, peer_addr);
            let session = match server::run_stream(config, stream, handler).await {
                Ok(session) => session,
                Err(e) => {
                    debug!("[{}] Handshake with {} failed: {}", id, peer_addr, e);
                    return;
                }
            };

            let handle = session.handle();
            tokio::pin!(session);
            tokio::select! {
                res = &mut session => log_session_end(id, peer_addr, res),
                _ = shutdown.changed() => {
                    debug!("[{}] Disconnecting {} on shutdown", id, peer_addr);
                    let disconnect = handle.disconnect(
                        russh::Disconnect::ByApplication,
                        String::from("server shutting down"),
                        String::from("en"),
                    );
                    match tokio::time::timeout(DISCONNECT_GRACE, disconnect).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => debug!("[{}] Disconnect of {} failed: {}", id, peer_addr, e),
                        Err(_) => debug!("[{}] Disconnect of {} timed out", id, peer_addr),
                    }

                    // The session has to run for the disconnect message to be sent
                    match tokio::time::timeout(DISCONNECT_GRACE, &mut session).await {
                        Ok(res) => log_session_end(id, peer_addr, res),
                        Err(_) => debug!("[{}] Dropping connection from {}", id, peer_addr),
                    }
                }
            }
        });
    }
}

fn log_session_end(id: Uuid, peer_addr: SocketAddr, res: Result<(), SessionError>) {
    match res {
        Ok(()) => debug!("[{}] Connection from {} closed", id, peer_addr),
        Err(e) => debug!("[{}] Connection from {} ended: {}", id, peer_addr, e),
    }
}
