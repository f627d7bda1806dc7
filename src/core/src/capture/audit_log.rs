//! Local append-only audit log.
//!
//! Each captured attempt produces one human-readable line of the form
//! `YYYY/MM/DD HH:MM:SS <host> <user>:<secret>`. The file is opened once at
//! startup; failing to open it is a startup error. Writers on many
//! connection tasks are serialized by the mutex around the sink.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use chrono::Local;
use log::{debug, info};

use crate::error_handling::types::CaptureError;

pub struct AuditLog {
    sink: Option<Mutex<Box<dyn Write + Send>>>,
}

impl AuditLog {
    /// Opens (or creates) the audit file in append mode.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options.open(path).map_err(CaptureError::AuditLogError)?;
        info!("Audit log opened at {}", path.display());
        Ok(Self::from_writer(file))
    }

    /// A sink that accepts and discards every line.
    pub fn disabled() -> Self {
        debug!("Audit log disabled");
        Self { sink: None }
    }

    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            sink: Some(Mutex::new(Box::new(writer))),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Appends the line for one credential attempt.
    pub fn record_attempt(&self, host: &str, user: &str, secret: &str) -> io::Result<()> {
        self.append(&format!("{} {}:{}", host, user, secret))
    }

    /// Appends one free-form line, prefixed with the local date and time.
    pub fn append(&self, message: &str) -> io::Result<()> {
        let Some(sink) = &self.sink else {
            return Ok(());
        };
        let line = format!("{} {}\n", Local::now().format("%Y/%m/%d %H:%M:%S"), message);
        let mut writer = sink
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "audit log mutex poisoned"))?;
        writer.write_all(line.as_bytes())?;
        writer.flush()
    }
}
