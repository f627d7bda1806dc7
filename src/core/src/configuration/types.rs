use serde::Deserialize;
use std::path::PathBuf;

use crate::storage::DatabaseStore;

/// Where captured attempts are delivered.
///
/// In TOML the variant is selected with the `backend` key:
///
/// ```toml
/// [store]
/// backend = "database"
/// url = "sqlite:///var/lib/honeygate/attempts.sqlite3?mode=rwc"
/// ```
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// JSON-lines files under `path`
    File { path: PathBuf },
    /// SeaORM database at `url`
    Database {
        #[serde(default = "default_database_url")]
        url: String,
    },
}

fn default_database_url() -> String {
    DatabaseStore::DEFAULT_URL.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File {
            path: PathBuf::from("/tmp/honeygate"),
        }
    }
}
