//! Data types shared by the capture and delivery subsystems.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One captured authentication try.
///
/// Created by the gate, handed to the delivery worker through the attempt
/// queue and dropped once the activity store has accepted it. Never mutated
/// in between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    /// Username claimed by the client
    pub user: String,
    /// Password offered by the client, verbatim
    pub pass: String,
    /// RFC 3339 UTC timestamp with nanosecond precision
    #[serde(rename = "ts")]
    pub timestamp: String,
    /// Full remote endpoint string as reported by the transport
    pub origin: String,
}

impl Attempt {
    /// Builds an attempt stamped with the current wall-clock time.
    pub fn now(user: &str, pass: &str, origin: &str) -> Self {
        Self::at(Utc::now(), user, pass, origin)
    }

    pub fn at(time: DateTime<Utc>, user: &str, pass: &str, origin: &str) -> Self {
        Self {
            user: user.to_string(),
            pass: pass.to_string(),
            timestamp: format_timestamp(time),
            origin: origin.to_string(),
        }
    }
}

/// The credential pair carried from the password callback to the
/// post-handshake phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Result of a password authentication. The gate only ever produces
/// granted permissions, so holding one means access was granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permissions {
    pub credentials: Credentials,
}

impl Permissions {
    pub fn granted(username: &str, password: &str) -> Self {
        Self {
            credentials: Credentials {
                username: username.to_string(),
                password: password.to_string(),
            },
        }
    }
}

/// Sortable RFC 3339 rendering used for every timestamp this crate emits.
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Splits `host:port` (or `[v6-host]:port`) and returns the host part.
///
/// Returns `None` when the endpoint has no port separator or when an
/// unbracketed host contains further colons.
pub fn split_host(endpoint: &str) -> Option<&str> {
    if let Some(rest) = endpoint.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        let port = tail.strip_prefix(':')?;
        if port.contains(':') || port.contains('[') || port.contains(']') {
            return None;
        }
        return Some(host);
    }

    let (host, port) = endpoint.rsplit_once(':')?;
    if host.contains(':') || host.contains('[') || host.contains(']') || port.contains(']') {
        return None;
    }
    Some(host)
}

/// Host identifier written to the audit log, falling back to the whole
/// endpoint when it cannot be split.
pub fn host_identifier(endpoint: &str) -> &str {
    split_host(endpoint).unwrap_or(endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_split_host_ipv4() {
        assert_eq!(split_host("203.0.113.5:51000"), Some("203.0.113.5"));
    }

    #[test]
    fn test_split_host_bracketed_ipv6() {
        assert_eq!(split_host("[2001:db8::1]:2222"), Some("2001:db8::1"));
    }

    #[test]
    fn test_split_host_named_host() {
        assert_eq!(split_host("scanner.example:22"), Some("scanner.example"));
    }

    #[test]
    fn test_host_identifier_falls_back_to_endpoint() {
        assert_eq!(host_identifier("not-an-endpoint"), "not-an-endpoint");
        assert_eq!(host_identifier("2001:db8::1"), "2001:db8::1");
        assert_eq!(host_identifier("[2001:db8::1]"), "[2001:db8::1]");
        assert_eq!(host_identifier(""), "");
    }

    #[test]
    fn test_timestamp_has_nanosecond_precision() {
        let time = Utc
            .with_ymd_and_hms(2024, 3, 1, 12, 30, 0)
            .unwrap()
            .with_nanosecond(123_456_789)
            .unwrap();

        assert_eq!(format_timestamp(time), "2024-03-01T12:30:00.123456789Z");
    }

    #[test]
    fn test_timestamps_sort_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let later = earlier + chrono::Duration::nanoseconds(1);

        assert!(format_timestamp(earlier) < format_timestamp(later));
    }

    #[test]
    fn test_attempt_serializes_timestamp_as_ts() {
        let attempt = Attempt {
            user: "root".to_string(),
            pass: "toor".to_string(),
            timestamp: "2024-03-01T12:30:00.000000000Z".to_string(),
            origin: "203.0.113.5:51000".to_string(),
        };

        let json = serde_json::to_value(&attempt).unwrap();
        assert_eq!(json["ts"], "2024-03-01T12:30:00.000000000Z");
        assert_eq!(json["origin"], "203.0.113.5:51000");
    }
}
