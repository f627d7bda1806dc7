use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use russh::server;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::capture::{attempt_queue, AuditLog, AuthGate, CaptureContext};
use crate::configuration::{Config, StoreConfig};
use crate::delivery::{Backlog, ConstantBackoff, DeliveryStats, DeliveryWorker};
use crate::error_handling::types::ControllerError;
use crate::network::{load_host_key, server_config, NetworkListener};
use crate::session_management::{AuditDispatcher, ConnectionFinalizer};
use crate::storage::{ActivityStore, DatabaseStore, FileStore};

/// Upper bound on the delivery worker's last flush during shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

pub struct Controller {
    config: Config,
    audit_log: Arc<AuditLog>,
    server_config: Arc<server::Config>,
}

impl Controller {
    /// Loads the host key and opens the audit log.
    ///
    /// # Errors
    ///
    /// `ControllerError::NetworkError` when the host key cannot be read or
    /// parsed, `ControllerError::CaptureError` when the audit log cannot be
    /// opened.
    pub fn new(config: Config) -> Result<Self, ControllerError> {
        info!("Initializing controller");

        let audit_log = match &config.audit_log_path {
            Some(path) => {
                let log = AuditLog::open(path)?;
                info!("Audit log at {}", path.display());
                log
            }
            None => {
                info!("Audit log disabled");
                AuditLog::disabled()
            }
        };

        let host_key = load_host_key(&config.host_key_path)?;
        let server_config = server_config(
            host_key,
            &config.version_banner,
            config.session_timeout(),
        );

        Ok(Self {
            config,
            audit_log: Arc::new(audit_log),
            server_config: Arc::new(server_config),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the honeypot with the configured store until Ctrl-C.
    pub async fn run(self) -> Result<DeliveryStats, ControllerError> {
        let running = match self.config.store.clone() {
            StoreConfig::File { path } => {
                info!("Activity store: files under {}", path.display());
                self.start(FileStore::new(path)).await?
            }
            StoreConfig::Database { url } => {
                info!("Activity store: database at {}", url);
                self.start(DatabaseStore::new(url)).await?
            }
        };

        running.run_until(shutdown_signal()).await
    }

    /// Binds the listener, logs into `store` and starts the delivery worker.
    ///
    /// A failed login is logged and the honeypot starts anyway; the worker
    /// keeps the attempts until the store comes back.
    pub async fn start<S>(self, mut store: S) -> Result<RunningHoneypot, ControllerError>
    where
        S: ActivityStore + 'static,
    {
        let (queue_tx, queue_rx) = attempt_queue(self.config.queue_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let gate = AuthGate::new(CaptureContext::new(Arc::clone(&self.audit_log), queue_tx));
        let finalizer = Arc::new(ConnectionFinalizer::new(AuditDispatcher::new(Arc::clone(
            &self.audit_log,
        ))));
        let listener = NetworkListener::bind(
            self.config.listen_address(),
            Arc::clone(&self.server_config),
            gate,
            finalizer,
        )
        .await?;
        let local_addr = listener.local_addr()?;

        if let Err(e) = store.login().await {
            warn!(
                "Failed to log into the activity store ({}), all writes will be buffered until it is reachable",
                e
            );
        }

        let worker = DeliveryWorker::new(
            store,
            ConstantBackoff::new(self.config.retry_interval()),
            Backlog::with_capacity(self.config.backlog_capacity),
        );
        let worker = tokio::spawn(worker.run(queue_rx, shutdown_rx.clone()));
        let listener = tokio::spawn(listener.serve(shutdown_rx));

        info!("Honeypot ready on {}", local_addr);
        Ok(RunningHoneypot {
            local_addr,
            shutdown_tx,
            listener,
            worker,
        })
    }
}

/// Handles of a started honeypot.
pub struct RunningHoneypot {
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    listener: JoinHandle<()>,
    worker: JoinHandle<DeliveryStats>,
}

impl RunningHoneypot {
    /// Address the listener is bound to, with the OS-assigned port resolved.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for `signal`, then shuts down.
    pub async fn run_until<F>(self, signal: F) -> Result<DeliveryStats, ControllerError>
    where
        F: Future<Output = ()>,
    {
        signal.await;
        info!("Shutdown requested");
        self.shutdown().await
    }

    /// Stops accepting, disconnects open sessions and lets the delivery
    /// worker make its last flush.
    pub async fn shutdown(self) -> Result<DeliveryStats, ControllerError> {
        let _ = self.shutdown_tx.send(true);

        self.listener
            .await
            .map_err(|e| ControllerError::TaskFailed(format!("listener: {}", e)))?;

        match tokio::time::timeout(SHUTDOWN_GRACE, self.worker).await {
            Ok(Ok(stats)) => Ok(stats),
            Ok(Err(e)) => Err(ControllerError::TaskFailed(format!("delivery worker: {}", e))),
            Err(_) => {
                error!(
                    "Delivery worker did not finish within {}s",
                    SHUTDOWN_GRACE.as_secs()
                );
                Err(ControllerError::TaskFailed(String::from(
                    "delivery worker timed out",
                )))
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Unable to listen for the shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
