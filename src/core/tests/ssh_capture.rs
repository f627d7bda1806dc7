//! A real SSH client against a started honeypot.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use honeygate::capture::Attempt;
use honeygate::configuration::{Config, StoreConfig};
use honeygate::controller::{Controller, RunningHoneypot};
use honeygate::storage::FileStore;
use russh::client;
use russh::keys::PublicKey;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;

const TEST_HOST_KEY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/test_hostkey");
const BANNER: &str = "SSH-2.0-OpenSSH_6.0p1 Debian-4+deb7u2";

#[derive(Clone, Default)]
struct TrustingClient {
    /// Set when the server sent an SSH disconnect message
    told_to_leave: Arc<AtomicBool>,
}

impl client::Handler for TrustingClient {
    type Error = russh::Error;

    async fn check_server_key(&mut self, _server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        Ok(true)
    }

    async fn disconnected(
        &mut self,
        reason: client::DisconnectReason<Self::Error>,
    ) -> Result<(), Self::Error> {
        if let client::DisconnectReason::ReceivedDisconnect(_) = reason {
            self.told_to_leave.store(true, Ordering::SeqCst);
        }
        Ok(())
    }
}

async fn start_honeypot(dir: &Path) -> RunningHoneypot {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = Config {
        bind_address: String::from("127.0.0.1"),
        port: 0,
        host_key_path: PathBuf::from(TEST_HOST_KEY),
        version_banner: String::from(BANNER),
        audit_log_path: Some(dir.join("attempts.log")),
        store: StoreConfig::File {
            path: dir.join("store"),
        },
        ..Default::default()
    };
    Controller::new(config)
        .unwrap()
        .start(FileStore::new(dir.join("store")))
        .await
        .unwrap()
}

fn stored_attempts(dir: &Path) -> Vec<Attempt> {
    std::fs::read_to_string(dir.join("store").join(FileStore::ATTEMPTS_FILE))
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[tokio::test]
async fn server_presents_the_configured_banner() {
    let dir = tempfile::tempdir().unwrap();
    let honeypot = start_honeypot(dir.path()).await;

    let stream = TcpStream::connect(honeypot.local_addr()).await.unwrap();
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    assert_eq!(line.trim_end(), BANNER);

    drop(reader);
    honeypot.shutdown().await.unwrap();
}

#[tokio::test]
async fn any_password_is_accepted_and_captured() {
    let dir = tempfile::tempdir().unwrap();
    let honeypot = start_honeypot(dir.path()).await;

    let config = Arc::new(client::Config::default());
    let mut session = client::connect(config, honeypot.local_addr(), TrustingClient::default())
        .await
        .unwrap();
    let auth = session.authenticate_password("root", "toor").await.unwrap();
    assert!(auth.success());

    // A session channel is only granted after the connection was dispatched
    let channel = session.channel_open_session().await.unwrap();
    drop(channel);
    session
        .disconnect(russh::Disconnect::ByApplication, "", "en")
        .await
        .unwrap();

    let stats = honeypot.shutdown().await.unwrap();
    assert_eq!(stats.pending, 0);

    let attempts = stored_attempts(dir.path());
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].user, "root");
    assert_eq!(attempts[0].pass, "toor");
    assert!(attempts[0].origin.starts_with("127.0.0.1:"));

    let audit = std::fs::read_to_string(dir.path().join("attempts.log")).unwrap();
    let lines: Vec<&str> = audit.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with(" 127.0.0.1 root:toor"));
    assert!(lines[1].contains("login 127.0.0.1:"));
    assert!(lines[1].ends_with(" root:toor"));
}

#[tokio::test]
async fn separate_connections_are_all_captured() {
    let dir = tempfile::tempdir().unwrap();
    let honeypot = start_honeypot(dir.path()).await;

    for pass in ["123456", "password", "admin"] {
        let config = Arc::new(client::Config::default());
        let mut session = client::connect(config, honeypot.local_addr(), TrustingClient::default())
            .await
            .unwrap();
        let auth = session.authenticate_password("admin", pass).await.unwrap();
        assert!(auth.success());
        session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .unwrap();
    }

    honeypot.shutdown().await.unwrap();

    let passwords: Vec<String> = stored_attempts(dir.path())
        .into_iter()
        .map(|a| a.pass)
        .collect();
    assert_eq!(passwords, vec!["123456", "password", "admin"]);
}

#[tokio::test]
async fn shutdown_sends_disconnect_to_open_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let honeypot = start_honeypot(dir.path()).await;

    let client_handler = TrustingClient::default();
    let told_to_leave = Arc::clone(&client_handler.told_to_leave);
    let config = Arc::new(client::Config::default());
    let mut session = client::connect(config, honeypot.local_addr(), client_handler)
        .await
        .unwrap();
    let auth = session.authenticate_password("root", "toor").await.unwrap();
    assert!(auth.success());

    honeypot.shutdown().await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while !told_to_leave.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("server did not send a disconnect message");
}
