//! Record store implementations.
//!
//! A store persists the complete record sequence as one unit. There is no
//! locking or version check against the backing resource: exactly one process
//! is expected to own a given history file at a time, and two writers pointed
//! at the same file will overwrite each other's appends.

use crate::error::HistoryError;
use crate::legacy::decode_document;
use crate::model::InteractionRecord;
use async_trait::async_trait;
use log::{debug, info};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Default history location relative to the working directory.
pub const DEFAULT_HISTORY_PATH: &str = ".history/chat_history.json";

/// Full persisted state read back from a store.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Records in persisted (append) order.
    pub records: Vec<InteractionRecord>,
    /// Version marker of the resource at read time, if the store tracks one.
    pub version: Option<SystemTime>,
    /// True when legacy-shaped records were converted during the read.
    pub migrated: bool,
}

/// Durable backing resource for the record sequence.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read the persisted sequence. `Ok(None)` means the resource does not exist.
    async fn read(&self) -> Result<Option<Snapshot>, HistoryError>;

    /// Replace the persisted sequence with `records` and return the new version.
    async fn write(
        &self,
        records: &[InteractionRecord],
    ) -> Result<Option<SystemTime>, HistoryError>;

    /// Current version of the resource without decoding it.
    async fn version(&self) -> Result<Option<SystemTime>, HistoryError> {
        Ok(self.read().await?.and_then(|snapshot| snapshot.version))
    }

    /// Human readable location for logs and errors.
    fn location(&self) -> String;
}

/// JSON file store holding the whole history as one pretty-printed array.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    /// Target history file.
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store for the given file. Nothing is touched on disk until the first write.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the history file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file used to stage writes before the rename.
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "history.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, err: std::io::Error) -> HistoryError {
        HistoryError::io(self.path.display(), err)
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn read(&self) -> Result<Option<Snapshot>, HistoryError> {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("history file missing (path={})", self.path.display());
                return Ok(None);
            }
            Err(err) => return Err(self.io_error(err)),
        };
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|err| self.io_error(err))?;
        let decoded = decode_document(&contents)?;
        debug!(
            "read history file (path={}, records={}, migrated={})",
            self.path.display(),
            decoded.records.len(),
            decoded.migrated
        );
        Ok(Some(Snapshot {
            records: decoded.records,
            version: metadata.modified().ok(),
            migrated: decoded.migrated,
        }))
    }

    async fn write(
        &self,
        records: &[InteractionRecord],
    ) -> Result<Option<SystemTime>, HistoryError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| HistoryError::io(parent.display(), err))?;
        }
        let payload = serde_json::to_string_pretty(records)?;
        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, payload)
            .await
            .map_err(|err| HistoryError::io(temp_path.display(), err))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|err| self.io_error(err))?;
        debug!(
            "wrote history file (path={}, records={})",
            self.path.display(),
            records.len()
        );
        // the records are on disk at this point; the version is best effort
        Ok(self.version().await.ok().flatten())
    }

    async fn version(&self) -> Result<Option<SystemTime>, HistoryError> {
        match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => Ok(metadata.modified().ok()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(self.io_error(err)),
        }
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

impl Default for JsonFileStore {
    fn default() -> Self {
        info!("using default history location ({DEFAULT_HISTORY_PATH})");
        Self::new(DEFAULT_HISTORY_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::{JsonFileStore, RecordStore};
    use crate::model::{InteractionRecord, Role};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[tokio::test]
    async fn read_missing_file_returns_none() {
        let temp = tempdir().expect("tempdir");
        let store = JsonFileStore::new(temp.path().join("nope.json"));
        assert_eq!(store.read().await.expect("read"), None);
        assert_eq!(store.version().await.expect("version"), None);
    }

    #[tokio::test]
    async fn write_creates_parent_directories_and_leaves_no_temp_file() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("deeper").join("history.json");
        let store = JsonFileStore::new(&path);
        let record = InteractionRecord::new(Role::User, "hello", Utc::now());

        let version = store.write(std::slice::from_ref(&record)).await.expect("write");
        assert!(version.is_some());
        assert!(path.is_file());
        assert_eq!(path.with_file_name("history.json.tmp").exists(), false);

        let snapshot = store.read().await.expect("read").expect("snapshot");
        assert_eq!(snapshot.records, vec![record]);
        assert_eq!(snapshot.migrated, false);
    }

    #[tokio::test]
    async fn read_surfaces_corrupt_data_as_error() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("history.json");
        std::fs::write(&path, "{ not json").expect("write");
        let store = JsonFileStore::new(&path);
        assert!(store.read().await.is_err());
    }
}
