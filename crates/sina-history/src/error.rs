//! Error types for history operations.

/// Errors returned by record stores and the history accessor.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// IO error while touching the backing resource.
    #[error("io error on {path}: {source}")]
    Io {
        /// Resource the operation targeted.
        path: String,
        /// Underlying IO failure.
        source: std::io::Error,
    },
    /// Serialization or decoding error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Persisted data did not match any known record shape.
    #[error("unrecognized record at index {index}: {reason}")]
    UnknownShape {
        /// Position of the offending element.
        index: usize,
        /// Decoder message.
        reason: String,
    },
    /// Export format name was not recognised.
    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),
}

impl HistoryError {
    /// Wrap an IO error with the resource it happened on.
    pub(crate) fn io(path: impl std::fmt::Display, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            source,
        }
    }
}
