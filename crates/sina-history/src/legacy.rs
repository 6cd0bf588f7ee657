//! Decoding of persisted history, including the legacy record shapes.
//!
//! Older files hold either chat messages (`role`, `content`, `timestamp`,
//! `messageId`) or shell command entries (`input`, `command`, `output`,
//! `error`, `timestamp`). Both are mapped once into canonical records here so
//! the rest of the crate only sees [`InteractionRecord`].

use crate::error::HistoryError;
use crate::model::{InteractionRecord, Role};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PersistedRecord {
    Canonical(InteractionRecord),
    Message(LegacyMessage),
    Command(LegacyCommand),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyMessage {
    role: String,
    content: String,
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    message_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LegacyCommand {
    #[serde(default)]
    input: String,
    command: String,
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    timestamp: Option<i64>,
}

/// Records decoded from a persisted document.
#[derive(Debug)]
pub(crate) struct Decoded {
    pub(crate) records: Vec<InteractionRecord>,
    /// True when at least one element used a legacy shape.
    pub(crate) migrated: bool,
}

/// Decode a persisted JSON document into canonical records, in file order.
pub(crate) fn decode_document(contents: &str) -> Result<Decoded, HistoryError> {
    if contents.trim().is_empty() {
        return Ok(Decoded {
            records: Vec::new(),
            migrated: false,
        });
    }
    let elements: Vec<Value> = serde_json::from_str(contents)?;
    let mut records = Vec::with_capacity(elements.len());
    let mut migrated = false;
    for (index, element) in elements.into_iter().enumerate() {
        let persisted: PersistedRecord =
            serde_json::from_value(element).map_err(|err| HistoryError::UnknownShape {
                index,
                reason: err.to_string(),
            })?;
        match persisted {
            PersistedRecord::Canonical(record) => records.push(record),
            PersistedRecord::Message(message) => {
                migrated = true;
                records.push(migrate_message(message, index)?);
            }
            PersistedRecord::Command(command) => {
                migrated = true;
                records.extend(migrate_command(command));
            }
        }
    }
    Ok(Decoded { records, migrated })
}

fn migrate_message(message: LegacyMessage, index: usize) -> Result<InteractionRecord, HistoryError> {
    let role = message
        .role
        .parse::<Role>()
        .map_err(|reason| HistoryError::UnknownShape { index, reason })?;
    let id = message
        .message_id
        .as_deref()
        .and_then(|id| Uuid::parse_str(id).ok())
        .unwrap_or_else(Uuid::new_v4);
    Ok(InteractionRecord {
        id,
        role,
        content: message.content,
        created_at: timestamp_from_millis(message.timestamp),
    })
}

fn migrate_command(command: LegacyCommand) -> Vec<InteractionRecord> {
    let created_at = timestamp_from_millis(command.timestamp);
    let mut records = Vec::with_capacity(3);
    if !command.input.is_empty() {
        records.push(InteractionRecord::new(Role::User, command.input, created_at));
    }
    records.push(InteractionRecord::new(
        Role::Assistant,
        command.command,
        created_at,
    ));
    let output = command.output.unwrap_or_default();
    let error = command.error.unwrap_or_default();
    if !output.is_empty() || !error.is_empty() {
        let mut note = String::new();
        if !output.is_empty() {
            note.push_str("stdout:\n");
            note.push_str(&output);
        }
        if !error.is_empty() {
            if !note.is_empty() {
                note.push('\n');
            }
            note.push_str("stderr:\n");
            note.push_str(&error);
        }
        records.push(InteractionRecord::new(Role::System, note, created_at));
    }
    records
}

fn timestamp_from_millis(millis: Option<i64>) -> DateTime<Utc> {
    millis
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
