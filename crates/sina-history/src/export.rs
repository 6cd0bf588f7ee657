//! Whole-history export formats.

use crate::error::HistoryError;
use crate::model::InteractionRecord;
use std::fmt;
use std::str::FromStr;

/// Fixed column order for tabular exports.
pub const CSV_COLUMNS: [&str; 4] = ["id", "role", "content", "createdAt"];

/// Serialization used by `ChatHistory::export_history`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Structural form preserving every field.
    #[default]
    Json,
    /// Flat comma separated rows. Embedded commas and newlines are not escaped.
    Csv,
}

impl ExportFormat {
    /// Return the format name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    /// Render the records in this format.
    pub fn render(&self, records: &[InteractionRecord]) -> Result<String, HistoryError> {
        match self {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(records)?),
            ExportFormat::Csv => Ok(render_csv(records)),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = HistoryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(HistoryError::UnsupportedFormat(other.to_string())),
        }
    }
}

fn render_csv(records: &[InteractionRecord]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(CSV_COLUMNS.join(","));
    for record in records {
        lines.push(
            [
                record.id.to_string(),
                record.role.to_string(),
                record.content.clone(),
                record.created_at.to_rfc3339(),
            ]
            .join(","),
        );
    }
    lines.join("\n")
}
