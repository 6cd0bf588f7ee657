use async_trait::async_trait;
use parking_lot::Mutex;
use sina_history::{HistoryError, InteractionRecord, RecordStore, Snapshot};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

/// In-memory record store. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<Option<Vec<InteractionRecord>>>>,
    writes: Arc<Mutex<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<InteractionRecord>) -> Self {
        let store = Self::default();
        *store.records.lock() = Some(records);
        store
    }

    /// Records as last written, `None` if never written.
    pub fn persisted(&self) -> Option<Vec<InteractionRecord>> {
        self.records.lock().clone()
    }

    pub fn write_count(&self) -> usize {
        *self.writes.lock()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn read(&self) -> Result<Option<Snapshot>, HistoryError> {
        Ok(self.records.lock().clone().map(|records| Snapshot {
            records,
            version: None,
            migrated: false,
        }))
    }

    async fn write(
        &self,
        records: &[InteractionRecord],
    ) -> Result<Option<SystemTime>, HistoryError> {
        *self.records.lock() = Some(records.to_vec());
        *self.writes.lock() += 1;
        Ok(None)
    }

    async fn version(&self) -> Result<Option<SystemTime>, HistoryError> {
        Ok(None)
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

/// Store whose writes can be switched to fail.
#[derive(Debug, Clone, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    failing: Arc<AtomicBool>,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn persisted(&self) -> Option<Vec<InteractionRecord>> {
        self.inner.persisted()
    }
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn read(&self) -> Result<Option<Snapshot>, HistoryError> {
        self.inner.read().await
    }

    async fn write(
        &self,
        records: &[InteractionRecord],
    ) -> Result<Option<SystemTime>, HistoryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(HistoryError::Io {
                path: self.location(),
                source: std::io::Error::other("write refused"),
            });
        }
        self.inner.write(records).await
    }

    fn location(&self) -> String {
        "failing-memory".to_string()
    }
}
