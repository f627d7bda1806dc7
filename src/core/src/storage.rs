//! Storage subsystem
//!
//! This module provides the activity stores captured attempts are
//! delivered to.
//!
//! Components:
//! - `storage_trait`: the `ActivityStore` trait used by the delivery worker.
//! - `file_storage`: JSON-lines files, one document per attempt.
//! - `database_storage`: ORM-based SQLite implementation using SeaORM.
//! - `db_entities`: SeaORM entity models for the database backend.

pub mod database_storage;
pub mod db_entities;
pub mod file_storage;
pub mod storage_trait;

pub use database_storage::DatabaseStore;
pub use file_storage::FileStore;
pub use storage_trait::ActivityStore;
