use super::types::*;
use crate::capture::attempt_queue::DEFAULT_QUEUE_CAPACITY;
use crate::error_handling::types::ConfigError;
use clap::Parser;
use log::debug;
use serde::Deserialize;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration structure that defines all runtime parameters.
///
/// Values come from three layers, each overriding the previous one: the
/// built-in defaults, an optional TOML file, and the command line.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use honeygate::configuration::Config;
///
/// let config = Config::from_file(Path::new("/etc/honeygate.toml")).unwrap();
/// println!("Listening on {}", config.listen_address());
/// ```
///
/// # Fields Overview
///
/// - `bind_address` / `port`: where the SSH listener binds (port 0 lets the OS pick)
/// - `host_key_path`: OpenSSH private key presented as the server identity
/// - `version_banner`: SSH identification string sent to clients
/// - `audit_log_path`: local append-only log of attempts, `None` disables it
/// - `queue_capacity`: slots in the attempt queue before authentications wait
/// - `retry_interval_secs`: pause after the store refused a reconnect
/// - `backlog_capacity`: `None` keeps every undelivered attempt, `Some(n)`
///   keeps the newest `n`
/// - `session_timeout_secs`: inactivity timeout of an SSH connection, 0 disables it
/// - `store`: activity store backend
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_address: String,
    pub port: u16,
    pub host_key_path: PathBuf,
    pub version_banner: String,
    pub audit_log_path: Option<PathBuf>,
    pub queue_capacity: usize,
    pub retry_interval_secs: u64,
    pub backlog_capacity: Option<usize>,
    pub session_timeout_secs: u64,
    pub store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: String::from("0.0.0.0"),
            port: 22,
            host_key_path: PathBuf::from("/tmp/hostkey"),
            version_banner: String::from("SSH-2.0-OpenSSH_6.0p1 Debian-4+deb7u2"),
            audit_log_path: Some(PathBuf::from("/tmp/ssh_attempts.log")),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            retry_interval_secs: 10,
            backlog_capacity: None,
            session_timeout_secs: 600,
            store: StoreConfig::default(),
        }
    }
}

/// Command line of the `honeygate` binary.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "honeygate")]
#[command(version)]
#[command(about = "SSH honeypot capturing every offered password")]
pub struct CliArgs {
    /// Optional TOML configuration file
    pub config_file: Option<PathBuf>,

    /// Address to bind to
    #[arg(short = 'b', long)]
    pub bind_address: Option<String>,

    /// Port to bind to
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Host key file for the server
    #[arg(short = 'k', long)]
    pub host_key: Option<PathBuf>,

    /// Version banner to present
    #[arg(short = 'v', long)]
    pub banner: Option<String>,

    /// Audit log of SSH attempts, an empty value disables it
    #[arg(short = 'l', long)]
    pub audit_log: Option<String>,

    /// Directory of the file activity store
    #[arg(long, conflicts_with = "store_url")]
    pub store_path: Option<PathBuf>,

    /// URL of the database activity store
    #[arg(long, env = "HONEYGATE_STORE_URL")]
    pub store_url: Option<String>,
}

impl Config {
    /// Reads and validates a TOML configuration file. Missing keys keep
    /// their default value.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        debug!("Configuration read from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the effective configuration for a command line.
    pub fn load(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = match &args.config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_args(args);
        config.validate()?;
        Ok(config)
    }

    fn apply_args(&mut self, args: &CliArgs) {
        if let Some(ref bind_address) = args.bind_address {
            self.bind_address = bind_address.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(ref host_key) = args.host_key {
            self.host_key_path = host_key.clone();
        }
        if let Some(ref banner) = args.banner {
            self.version_banner = banner.clone();
        }
        if let Some(ref audit_log) = args.audit_log {
            self.audit_log_path = if audit_log.is_empty() {
                None
            } else {
                Some(PathBuf::from(audit_log))
            };
        }
        if let Some(ref path) = args.store_path {
            self.store = StoreConfig::File { path: path.clone() };
        }
        if let Some(ref url) = args.store_url {
            self.store = StoreConfig::Database { url: url.clone() };
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_address.is_empty() {
            return Err(ConfigError::EmptyValue(String::from("bind_address")));
        }
        self.bind_address
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::BadIPFormatting(self.bind_address.clone()))?;

        if !self.version_banner.starts_with("SSH-2.0-") {
            return Err(ConfigError::NotInRange(format!(
                "version_banner must start with SSH-2.0-, got {:?}",
                self.version_banner
            )));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::NotInRange(String::from(
                "queue_capacity must be at least 1",
            )));
        }
        if self.backlog_capacity == Some(0) {
            return Err(ConfigError::NotInRange(String::from(
                "backlog_capacity must be at least 1 when set",
            )));
        }
        if self.host_key_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyValue(String::from("host_key_path")));
        }
        if matches!(&self.audit_log_path, Some(p) if p.as_os_str().is_empty()) {
            return Err(ConfigError::EmptyValue(String::from("audit_log_path")));
        }
        match &self.store {
            StoreConfig::File { path } if path.as_os_str().is_empty() => {
                Err(ConfigError::EmptyValue(String::from("store.path")))
            }
            StoreConfig::Database { url } if url.is_empty() => {
                Err(ConfigError::EmptyValue(String::from("store.url")))
            }
            _ => Ok(()),
        }
    }

    /// Socket address the listener binds to.
    pub fn listen_address(&self) -> SocketAddr {
        let ip = self
            .bind_address
            .parse::<IpAddr>()
            .unwrap_or(IpAddr::from([0, 0, 0, 0]));
        SocketAddr::new(ip, self.port)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    pub fn session_timeout(&self) -> Option<Duration> {
        match self.session_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
