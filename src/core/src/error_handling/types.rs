use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    BadIPFormatting(String),
    EmptyValue(String),
    NotInRange(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::BadIPFormatting(e) => write!(f, "IP formatting error: {}", e),
            ConfigError::EmptyValue(e) => write!(f, "Missing value: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// Errors raised on the per-connection path after the handshake.
///
/// Every variant is fatal for the connection that raised it and for that
/// connection only.
#[derive(Debug)]
pub enum SessionError {
    /// The granted authentication result reached the finalize step without
    /// the credential pair attached to it.
    MalformedCredentialHandoff,
    DispatchFailed(String),
    Transport(russh::Error),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::MalformedCredentialHandoff => {
                write!(f, "Authentication result is missing the offered credentials")
            }
            SessionError::DispatchFailed(e) => write!(f, "Session dispatch failed: {}", e),
            SessionError::Transport(e) => write!(f, "SSH transport error: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<russh::Error> for SessionError {
    fn from(err: russh::Error) -> Self {
        SessionError::Transport(err)
    }
}

#[derive(Debug)]
pub enum NetworkError {
    BindError(std::io::Error),
    SockError(std::io::Error),
    HostKeyError(String),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::BindError(e) => write!(f, "Network bind error: {}", e),
            NetworkError::SockError(e) => write!(f, "Socket error: {}", e),
            NetworkError::HostKeyError(e) => write!(f, "Host key error: {}", e),
        }
    }
}

impl std::error::Error for NetworkError {}

/// Failures reported by an activity store.
///
/// `ConnectionFailed` is what a failed `login` (or a write with no live
/// connection) reports; `WriteFailed` is a failed write on a live one.
/// Both are recoverable and never leave the delivery worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    ConnectionFailed,
    WriteFailed,
    ReadFailed,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::ConnectionFailed => write!(f, "Storage connection failed"),
            StorageError::WriteFailed => write!(f, "Storage write failed"),
            StorageError::ReadFailed => write!(f, "Storage read failed"),
        }
    }
}

impl std::error::Error for StorageError {}

#[derive(Debug)]
pub enum CaptureError {
    AuditLogError(std::io::Error),
    QueueClosed,
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::AuditLogError(e) => write!(f, "Audit log error: {}", e),
            CaptureError::QueueClosed => write!(f, "Attempt queue is closed"),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Startup-fatal conditions. Any of these aborts the process before the
/// listener accepts its first connection.
#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    NetworkError(NetworkError),
    StorageError(StorageError),
    CaptureError(CaptureError),
    InitializationFailed(String),
    TaskFailed(String),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::NetworkError(e) => write!(f, "Network error: {}", e),
            ControllerError::StorageError(e) => write!(f, "Storage error: {}", e),
            ControllerError::CaptureError(e) => write!(f, "Capture error: {}", e),
            ControllerError::InitializationFailed(e) => write!(f, "Initialization failed: {}", e),
            ControllerError::TaskFailed(e) => write!(f, "Background task failed: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::ConfigurationError(err)
    }
}

impl From<NetworkError> for ControllerError {
    fn from(err: NetworkError) -> Self {
        ControllerError::NetworkError(err)
    }
}

impl From<StorageError> for ControllerError {
    fn from(err: StorageError) -> Self {
        ControllerError::StorageError(err)
    }
}

impl From<CaptureError> for ControllerError {
    fn from(err: CaptureError) -> Self {
        ControllerError::CaptureError(err)
    }
}
