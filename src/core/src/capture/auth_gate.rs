//! The password gate.
//!
//! `AuthGate::authenticate` is the honeypot's password callback. It never
//! rejects: every credential is written to the audit log, published on the
//! attempt queue and granted, in that order. Queue submission is the only
//! point where it may suspend, which makes a saturated queue part of the
//! client's authentication latency.

use std::sync::Arc;

use log::{debug, error, warn};

use super::attempt_queue::AttemptSender;
use super::audit_log::AuditLog;
use super::types::{host_identifier, Attempt, Permissions};

/// Process-wide capture state, built once by the controller and shared by
/// every connection's gate.
#[derive(Clone)]
pub struct CaptureContext {
    pub audit_log: Arc<AuditLog>,
    pub queue: AttemptSender,
}

impl CaptureContext {
    pub fn new(audit_log: Arc<AuditLog>, queue: AttemptSender) -> Self {
        Self { audit_log, queue }
    }
}

#[derive(Clone)]
pub struct AuthGate {
    context: CaptureContext,
}

impl AuthGate {
    pub fn new(context: CaptureContext) -> Self {
        Self { context }
    }

    /// Captures one password attempt and grants it.
    ///
    /// * `remote` - remote endpoint of the connection, usually `ip:port`
    /// * `user` - username claimed by the client
    /// * `secret` - password offered by the client
    ///
    /// The returned permissions carry exactly `user` and `secret`. Failures
    /// to write the audit line or to queue the attempt are logged and do not
    /// change the outcome.
    pub async fn authenticate(&self, remote: &str, user: &str, secret: &str) -> Permissions {
        let host = host_identifier(remote);

        if let Err(e) = self.context.audit_log.record_attempt(host, user, secret) {
            warn!("Failed to write audit line for {}: {}", host, e);
        }

        let attempt = Attempt::now(user, secret, remote);
        if let Err(e) = self.context.queue.submit(attempt).await {
            error!("Attempt from {} was not queued: {}", remote, e);
        }

        debug!("Granted password authentication for {:?} from {}", user, host);
        Permissions::granted(user, secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::attempt_queue::attempt_queue;
    use std::fs;
    use tempfile::tempdir;

    fn gate_with_log(path: &std::path::Path, capacity: usize) -> (AuthGate, crate::capture::AttemptReceiver) {
        let audit = Arc::new(AuditLog::open(path).unwrap());
        let (tx, rx) = attempt_queue(capacity);
        (AuthGate::new(CaptureContext::new(audit, tx)), rx)
    }

    #[tokio::test]
    async fn test_always_grants_exact_credentials() {
        let (tx, mut rx) = attempt_queue(16);
        let gate = AuthGate::new(CaptureContext::new(Arc::new(AuditLog::disabled()), tx));

        let pairs = [
            ("root", "toor"),
            ("", ""),
            ("admin", "correct horse battery staple"),
            ("ünïcödé", "pass:with:colons"),
            ("user with spaces", "\u{0}\u{1}"),
        ];
        for (user, secret) in pairs {
            let permissions = gate.authenticate("198.51.100.1:2200", user, secret).await;
            assert_eq!(permissions.credentials.username, user);
            assert_eq!(permissions.credentials.password, secret);

            let queued = rx.recv().await.unwrap();
            assert_eq!(queued.user, user);
            assert_eq!(queued.pass, secret);
        }
    }

    #[tokio::test]
    async fn test_happy_path_logs_and_queues_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("attempts.log");
        let (gate, mut rx) = gate_with_log(&path, 16);

        gate.authenticate("203.0.113.5:51000", "root", "toor").await;

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.trim_end().ends_with(" 203.0.113.5 root:toor"));

        let queued = rx.try_recv().unwrap();
        assert_eq!(queued.user, "root");
        assert_eq!(queued.pass, "toor");
        assert_eq!(queued.origin, "203.0.113.5:51000");
        assert!(rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_unparseable_endpoint_is_used_verbatim() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("attempts.log");
        let (gate, mut rx) = gate_with_log(&path, 16);

        gate.authenticate("unix-socket", "guest", "guest").await;

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.trim_end().ends_with(" unix-socket guest:guest"));
        assert_eq!(rx.try_recv().unwrap().origin, "unix-socket");
    }

    #[tokio::test]
    async fn test_audit_line_written_before_submit_completes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("attempts.log");
        let (gate, mut rx) = gate_with_log(&path, 1);

        gate.authenticate("192.0.2.1:1000", "first", "a").await;

        // Queue is full: the second call is parked on submission.
        let second = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.authenticate("192.0.2.2:1000", "second", "b").await })
        };
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(!second.is_finished());

        assert_eq!(rx.recv().await.unwrap().user, "first");
        let permissions = second.await.unwrap();
        assert_eq!(permissions.credentials.username, "second");
        assert_eq!(rx.recv().await.unwrap().user, "second");
    }

    #[tokio::test]
    async fn test_grants_even_when_queue_closed() {
        let (tx, mut rx) = attempt_queue(4);
        rx.close();
        let gate = AuthGate::new(CaptureContext::new(Arc::new(AuditLog::disabled()), tx));

        let permissions = gate.authenticate("192.0.2.1:22", "oracle", "oracle").await;
        assert_eq!(permissions, Permissions::granted("oracle", "oracle"));
    }
}
