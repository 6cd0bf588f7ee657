//! Append-only interaction log for SINA.
//!
//! Records are kept in memory by a [`ChatHistory`] and flushed wholesale to a
//! [`RecordStore`] on every mutation. The default store is a single JSON file.

pub mod error;
pub mod export;
pub mod history;
mod legacy;
pub mod model;
pub mod store;

/// History error type.
pub use error::HistoryError;
/// Export formats for the full history.
pub use export::ExportFormat;
/// Accessor and backing aggregate.
pub use history::{ChatHistory, HistoryStore, LoadOutcome};
/// Interaction record model.
pub use model::{InteractionRecord, Role};
/// Store interface and default file implementation.
pub use store::{DEFAULT_HISTORY_PATH, JsonFileStore, RecordStore, Snapshot};
