//! In-memory history cache and the accessor used by agents.

use crate::error::HistoryError;
use crate::export::ExportFormat;
use crate::model::{InteractionRecord, Role};
use crate::store::{JsonFileStore, RecordStore};
use chrono::Utc;
use log::{debug, info, warn};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

/// Result of a [`HistoryStore::load`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The backing resource does not exist; in-memory state left as is.
    Missing,
    /// Records were read from the backing resource.
    Loaded {
        /// Number of records now held in memory.
        records: usize,
        /// Legacy records were converted and rewritten.
        migrated: bool,
    },
    /// The resource has not changed since the last sync.
    Unchanged,
    /// The resource could not be read or decoded; the sequence was reset.
    Recovered {
        /// Description of the failure.
        reason: String,
    },
}

/// Authoritative record sequence plus the store it is flushed to.
pub struct HistoryStore {
    store: Arc<dyn RecordStore>,
    records: Vec<InteractionRecord>,
    /// Version of the resource at the last load or save. Outer `None` means never synced.
    synced: Option<Option<SystemTime>>,
}

impl fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryStore")
            .field("location", &self.store.location())
            .field("records", &self.records.len())
            .finish()
    }
}

impl HistoryStore {
    /// Create an empty, unloaded aggregate over the given store.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            records: Vec::new(),
            synced: None,
        }
    }

    /// Records in append order.
    pub fn records(&self) -> &[InteractionRecord] {
        &self.records
    }

    /// Location of the backing resource.
    pub fn location(&self) -> String {
        self.store.location()
    }

    /// Hydrate from the backing resource.
    ///
    /// Never fails: unreadable or corrupt data resets the sequence to empty and
    /// is reported as [`LoadOutcome::Recovered`]. After the first load, the
    /// in-memory sequence is only replaced when the resource is newer than the
    /// last load or save.
    pub async fn load(&mut self) -> LoadOutcome {
        let location = self.store.location();
        if let Some(synced) = self.synced {
            match self.store.version().await {
                Ok(None) => return LoadOutcome::Missing,
                Ok(Some(current)) if synced.is_some_and(|synced| current <= synced) => {
                    debug!("history unchanged since last sync (location={location})");
                    return LoadOutcome::Unchanged;
                }
                Ok(Some(_)) => {}
                Err(err) => return self.recover(&location, format!("{location}: {err}"), None),
            }
        }

        match self.store.read().await {
            Ok(None) => {
                debug!("no persisted history (location={location})");
                self.synced = Some(None);
                LoadOutcome::Missing
            }
            Ok(Some(snapshot)) => {
                self.records = snapshot.records;
                self.synced = Some(snapshot.version);
                if snapshot.migrated {
                    info!("migrating legacy history records (location={location})");
                    if let Err(err) = self.save().await {
                        warn!("failed to rewrite migrated history (location={location}): {err}");
                    }
                }
                info!(
                    "loaded history (location={location}, records={})",
                    self.records.len()
                );
                LoadOutcome::Loaded {
                    records: self.records.len(),
                    migrated: snapshot.migrated,
                }
            }
            Err(err) => {
                let version = self.store.version().await.ok().flatten();
                self.recover(&location, format!("{location}: {err}"), version)
            }
        }
    }

    fn recover(
        &mut self,
        location: &str,
        reason: String,
        version: Option<SystemTime>,
    ) -> LoadOutcome {
        warn!("failed to load history, starting empty (location={location}): {reason}");
        self.records.clear();
        self.synced = Some(version);
        LoadOutcome::Recovered { reason }
    }

    /// Flush the full sequence to the backing resource.
    pub async fn save(&mut self) -> Result<(), HistoryError> {
        let version = self.store.write(&self.records).await?;
        self.synced = Some(version);
        Ok(())
    }

    /// Append and flush; on a failed flush the record is dropped again.
    pub(crate) async fn append(&mut self, record: InteractionRecord) -> Result<(), HistoryError> {
        self.records.push(record);
        if let Err(err) = self.save().await {
            self.records.pop();
            return Err(err);
        }
        Ok(())
    }

    /// Remove every record and flush; restores the sequence if the flush fails.
    pub(crate) async fn clear(&mut self) -> Result<usize, HistoryError> {
        let previous = std::mem::take(&mut self.records);
        if let Err(err) = self.save().await {
            self.records = previous;
            return Err(err);
        }
        Ok(previous.len())
    }
}

/// Accessor that mediates every read and write of the interaction log.
#[derive(Debug)]
pub struct ChatHistory {
    inner: HistoryStore,
}

impl ChatHistory {
    /// Construct over a store and hydrate it before returning.
    pub async fn open(store: Arc<dyn RecordStore>) -> Self {
        let mut inner = HistoryStore::new(store);
        let outcome = inner.load().await;
        debug!(
            "history opened (location={}, outcome={outcome:?})",
            inner.location()
        );
        Self { inner }
    }

    /// Open a JSON file backed history.
    pub async fn open_path(path: impl AsRef<Path>) -> Self {
        Self::open(Arc::new(JsonFileStore::new(path))).await
    }

    /// Re-read the backing resource if it changed since the last sync.
    pub async fn reload(&mut self) -> LoadOutcome {
        self.inner.load().await
    }

    /// Append a record and persist it before returning.
    ///
    /// A successful return means the record is durable. On failure the record
    /// is not kept in memory either.
    pub async fn add_message(
        &mut self,
        role: Role,
        content: impl Into<String>,
    ) -> Result<InteractionRecord, HistoryError> {
        let now = Utc::now();
        let created_at = match self.inner.records().last() {
            Some(last) if last.created_at > now => last.created_at,
            _ => now,
        };
        let record = InteractionRecord::new(role, content, created_at);
        self.inner.append(record.clone()).await?;
        debug!(
            "appended record (id={}, role={}, content_len={})",
            record.id,
            record.role,
            record.content.len()
        );
        Ok(record)
    }

    /// Owned copy of every record in append order.
    pub fn get_history(&self) -> Vec<InteractionRecord> {
        self.inner.records().to_vec()
    }

    /// Borrowed view of the records in append order.
    pub fn records(&self) -> &[InteractionRecord] {
        self.inner.records()
    }

    /// The most recent `count` records, oldest first.
    pub fn last(&self, count: usize) -> Vec<InteractionRecord> {
        let records = self.inner.records();
        let start = records.len().saturating_sub(count);
        records[start..].to_vec()
    }

    /// Case-insensitive substring search over record content, in append order.
    pub fn search_history(&self, query: &str) -> Vec<InteractionRecord> {
        let needle = query.to_lowercase();
        self.inner
            .records()
            .iter()
            .filter(|record| record.content.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Serialize the full history.
    pub fn export_history(&self, format: ExportFormat) -> Result<String, HistoryError> {
        format.render(self.inner.records())
    }

    /// Drop every record and persist the empty history. Returns the number removed.
    pub async fn clear(&mut self) -> Result<usize, HistoryError> {
        let removed = self.inner.clear().await?;
        info!(
            "cleared history (location={}, removed={removed})",
            self.inner.location()
        );
        Ok(removed)
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.inner.records().len()
    }

    /// Whether the history holds no records.
    pub fn is_empty(&self) -> bool {
        self.inner.records().is_empty()
    }

    /// Location of the backing resource.
    pub fn location(&self) -> String {
        self.inner.location()
    }
}
