use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capture::types::format_timestamp;

/// What the session dispatcher learns about an accepted connection.
///
/// Built once per successful handshake and never persisted by the capture
/// pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Correlates log lines of one connection
    pub id: Uuid,
    /// RFC3339 time the handshake completed
    pub login_time: String,
    /// Remote endpoint
    pub source: String,
    /// Local endpoint the client connected to
    pub destination: String,
    pub user: String,
    pub pass: String,
}

impl ConnectionRecord {
    pub fn new(id: Uuid, source: &str, destination: &str, user: String, pass: String) -> Self {
        Self {
            id,
            login_time: format_timestamp(Utc::now()),
            source: source.to_string(),
            destination: destination.to_string(),
            user,
            pass,
        }
    }
}
