use std::path::{Path, PathBuf};

use log::{debug, error, info};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::capture::Attempt;
use crate::error_handling::types::StorageError;
use crate::storage::storage_trait::ActivityStore;

/// Activity store writing one JSON document per line under a directory.
///
/// `login` (re)creates the directory and opens `attempts.jsonl` for append.
/// A failed write drops the open handle, so the next write fails fast until
/// the worker logs in again.
pub struct FileStore {
    base_path: PathBuf,
    attempts: Option<File>,
}

impl FileStore {
    pub const ATTEMPTS_FILE: &'static str = "attempts.jsonl";

    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            attempts: None,
        }
    }

    pub fn attempts_path(&self) -> PathBuf {
        self.base_path.join(Self::ATTEMPTS_FILE)
    }

    pub fn is_connected(&self) -> bool {
        self.attempts.is_some()
    }
}

impl ActivityStore for FileStore {
    async fn login(&mut self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            error!("Failed to create store dir {}: {}", self.base_path.display(), e);
            StorageError::ConnectionFailed
        })?;

        let path = self.attempts_path();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| {
                error!("Failed to open {}: {}", path.display(), e);
                StorageError::ConnectionFailed
            })?;

        self.attempts = Some(file);
        info!("FileStore ready at {}", path.display());
        Ok(())
    }

    async fn write_attempt(&mut self, attempt: &Attempt) -> Result<(), StorageError> {
        let Some(file) = self.attempts.as_mut() else {
            return Err(StorageError::ConnectionFailed);
        };

        let mut line = serde_json::to_vec(attempt).map_err(|e| {
            error!("Failed to serialize attempt: {}", e);
            StorageError::WriteFailed
        })?;
        line.push(b'\n');

        let written = match file.write_all(&line).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            error!("Write failed {}: {}", self.base_path.display(), e);
            self.attempts = None;
            return Err(StorageError::WriteFailed);
        }

        debug!("Appended attempt from {} to {}", attempt.origin, Self::ATTEMPTS_FILE);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn read_attempts(path: &Path) -> Vec<Attempt> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_write_before_login_fails() {
        let dir = tempdir().unwrap();
        let mut store = FileStore::new(dir.path());

        let res = store
            .write_attempt(&Attempt::now("root", "toor", "203.0.113.5:51000"))
            .await;
        assert_eq!(res, Err(StorageError::ConnectionFailed));
        assert!(!store.is_connected());
    }

    #[tokio::test]
    async fn test_login_creates_directory_and_appends() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("activity");
        let mut store = FileStore::new(&base);
        store.login().await.unwrap();

        let a1 = Attempt::now("root", "toor", "203.0.113.5:51000");
        let a2 = Attempt::now("admin", "1234", "198.51.100.2:40000");
        store.write_attempt(&a1).await.unwrap();
        store.write_attempt(&a2).await.unwrap();

        assert_eq!(read_attempts(&store.attempts_path()), vec![a1, a2]);
    }

    #[tokio::test]
    async fn test_relogin_keeps_previous_lines() {
        let dir = tempdir().unwrap();
        let a1 = Attempt::now("root", "toor", "203.0.113.5:51000");
        let a2 = Attempt::now("pi", "raspberry", "203.0.113.6:51000");

        let mut store = FileStore::new(dir.path());
        store.login().await.unwrap();
        store.write_attempt(&a1).await.unwrap();
        store.login().await.unwrap();
        store.write_attempt(&a2).await.unwrap();

        assert_eq!(read_attempts(&store.attempts_path()), vec![a1, a2]);
    }

    #[tokio::test]
    async fn test_login_fails_when_base_is_a_file() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let mut store = FileStore::new(&blocker);
        assert_eq!(store.login().await, Err(StorageError::ConnectionFailed));
    }
}
