use log::{debug, error, info};
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, EntityTrait, QueryOrder, Schema, Set,
};

use crate::capture::Attempt;
use crate::error_handling::types::StorageError;
use crate::storage::db_entities::attempts;
use crate::storage::storage_trait::ActivityStore;

/// Activity store backed by a SeaORM database (SQLite by default).
///
/// The connection is only opened by `login`, which also creates the
/// `attempts` table when it does not exist yet.
pub struct DatabaseStore {
    url: String,
    conn: Option<DatabaseConnection>,
}

impl DatabaseStore {
    /// Default database URL, relative to the working directory
    pub const DEFAULT_URL: &'static str = "sqlite://honeygate.sqlite3?mode=rwc";

    pub fn new<S: Into<String>>(url: S) -> Self {
        Self {
            url: url.into(),
            conn: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Every stored attempt in write order.
    pub async fn fetch_attempts(&self) -> Result<Vec<Attempt>, StorageError> {
        let conn = self.conn.as_ref().ok_or(StorageError::ConnectionFailed)?;
        let rows = attempts::Entity::find()
            .order_by_asc(attempts::Column::Id)
            .all(conn)
            .await
            .map_err(|e| {
                error!("Failed to read attempts: {}", e);
                StorageError::ReadFailed
            })?;

        Ok(rows
            .into_iter()
            .map(|row| Attempt {
                user: row.user,
                pass: row.pass,
                timestamp: row.ts,
                origin: row.origin,
            })
            .collect())
    }
}

impl ActivityStore for DatabaseStore {
    async fn login(&mut self) -> Result<(), StorageError> {
        let conn = Database::connect(self.url.as_str()).await.map_err(|e| {
            error!("Failed to connect to {}: {}", self.url, e);
            StorageError::ConnectionFailed
        })?;

        let backend = conn.get_database_backend();
        let mut create = Schema::new(backend).create_table_from_entity(attempts::Entity);
        create.if_not_exists();
        conn.execute(backend.build(&create)).await.map_err(|e| {
            error!("Failed to create attempts table: {}", e);
            StorageError::ConnectionFailed
        })?;

        self.conn = Some(conn);
        info!("DatabaseStore connected to {}", self.url);
        Ok(())
    }

    async fn write_attempt(&mut self, attempt: &Attempt) -> Result<(), StorageError> {
        let conn = self.conn.as_ref().ok_or(StorageError::ConnectionFailed)?;

        let row = attempts::ActiveModel {
            user: Set(attempt.user.clone()),
            pass: Set(attempt.pass.clone()),
            ts: Set(attempt.timestamp.clone()),
            origin: Set(attempt.origin.clone()),
            ..Default::default()
        };
        attempts::Entity::insert(row).exec(conn).await.map_err(|e| {
            error!("Failed to insert attempt from {}: {}", attempt.origin, e);
            StorageError::WriteFailed
        })?;

        debug!("Inserted attempt from {}", attempt.origin);
        Ok(())
    }
}
