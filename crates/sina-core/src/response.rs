//! Interpretation of shell agent replies.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// Explanation attached to replies that were not JSON.
const PLAIN_TEXT_EXPLANATION: &str = "Converted plain text response to command";

/// Structured reply requested from the model by the shell agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellCommand {
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ShellCommand {
    /// Parse a model reply.
    ///
    /// A reply that starts with `{` must be a command object. Otherwise the
    /// first fenced code block is used, then the first object embedded in
    /// surrounding prose. Anything else is taken verbatim as the command.
    pub fn parse(reply: &str) -> Result<Self, CoreError> {
        let trimmed = reply.trim();
        if trimmed.is_empty() {
            return Err(CoreError::Parse("empty model reply".to_string()));
        }
        if trimmed.starts_with('{') {
            return decode_object(trimmed);
        }
        if let Some(body) = fenced_body(trimmed) {
            if body.starts_with('{') {
                return decode_object(body);
            }
            if !body.is_empty() {
                return Ok(Self::plain(body));
            }
        }
        if let Some(start) = trimmed.find('{')
            && let Ok(parsed) = decode_object(&trimmed[start..])
        {
            return Ok(parsed);
        }
        Ok(Self::plain(trimmed))
    }

    fn plain(command: &str) -> Self {
        ShellCommand {
            command: command.to_string(),
            explanation: PLAIN_TEXT_EXPLANATION.to_string(),
            error: None,
        }
    }

    /// True when there is a command to run.
    pub fn is_runnable(&self) -> bool {
        !self.command.is_empty()
    }

    fn normalized(mut self) -> Self {
        self.command = self.command.trim().to_string();
        self.explanation = self.explanation.trim().to_string();
        self.error = self
            .error
            .map(|error| error.trim().to_string())
            .filter(|error| !error.is_empty());
        self
    }
}

/// Decode the object starting at index 0, ignoring anything after it.
fn decode_object(text: &str) -> Result<ShellCommand, CoreError> {
    let json = match find_matching_brace(text) {
        Some(end) => &text[..=end],
        None => text,
    };
    serde_json::from_str::<ShellCommand>(json)
        .map(ShellCommand::normalized)
        .map_err(|err| CoreError::Parse(format!("invalid command JSON: {err}")))
}

/// Contents of the first fenced code block, without the language tag.
fn fenced_body(text: &str) -> Option<&str> {
    let start = text.find("```")? + 3;
    let body_start = text[start..]
        .find('\n')
        .map(|offset| start + offset + 1)
        .unwrap_or(start);
    let end = text[body_start..].find("```")?;
    Some(text[body_start..body_start + end].trim())
}

/// Index of the brace closing the object opened at index 0.
fn find_matching_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}
