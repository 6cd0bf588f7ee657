//! Error types for the agent runtime.

use sina_history::HistoryError;
use thiserror::Error;

/// Errors returned by agent operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Interaction log read or write failed.
    #[error("history error: {0}")]
    History(#[from] HistoryError),
    /// System prompt could not be loaded or replaced.
    #[error("prompt error: {0}")]
    Prompt(String),
    /// The model call failed.
    #[error("completion error: {0}")]
    Completion(String),
    /// Shell command could not be executed.
    #[error("command error: {0}")]
    Command(String),
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Model reply could not be interpreted.
    #[error("parse error: {0}")]
    Parse(String),
}
