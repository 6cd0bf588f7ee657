//! System prompt source and per-request prompt template.

use crate::error::CoreError;
use autoagents_llm::chat::{ChatMessage, ChatRole, MessageType};
use log::{debug, info};
use regex::{Captures, Regex};
use sina_config::PromptConfig;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Built-in instructions used when no prompt file is present.
pub const DEFAULT_PROMPT: &str = r#"# SINA: Shell-Integrated Neural Agent

You are SINA, an agent that turns requests into shell commands for {{os}} and runs them with `{{shell}}` in `{{cwd}}`.

You MUST reply with a single JSON object and nothing else:
{
  "command": "shell command to execute",
  "explanation": "what the command does",
  "error": "optional, set when the request cannot be served"
}

## Operating rules
1. Output valid JSON only, without markdown fences.
2. Quote and escape every argument.
3. Prefer absolute paths for file operations.
4. Keep explanations short.
5. Leave `command` empty and fill `error` when a request is unsafe or impossible.

## Output streams
- stdout: command output
- stderr: explanations and errors
"#;

static TEMPLATE_VARIABLE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").ok());

/// File-backed system instruction source, read on every request.
#[derive(Debug, Clone)]
pub struct PromptSource {
    path: PathBuf,
    required: bool,
}

impl PromptSource {
    pub fn new(path: impl AsRef<Path>, required: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            required,
        }
    }

    pub fn from_config(config: &PromptConfig) -> Self {
        Self::new(&config.path, config.required)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current system prompt.
    ///
    /// A missing file falls back to [`DEFAULT_PROMPT`] unless the source is
    /// marked required.
    pub async fn load(&self) -> Result<String, CoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => {
                debug!(
                    "loaded system prompt (path={}, len={})",
                    self.path.display(),
                    contents.len()
                );
                Ok(contents)
            }
            Err(err) if err.kind() == ErrorKind::NotFound && !self.required => {
                debug!(
                    "prompt file missing, using built-in prompt (path={})",
                    self.path.display()
                );
                Ok(DEFAULT_PROMPT.to_string())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Err(CoreError::Prompt(format!(
                "prompt file not found: {}",
                self.path.display()
            ))),
            Err(err) => Err(CoreError::Prompt(format!(
                "failed to read {}: {err}",
                self.path.display()
            ))),
        }
    }

    /// Fail when a required prompt file cannot be read. Checked once before
    /// an agent starts serving requests.
    pub async fn ensure_available(&self) -> Result<(), CoreError> {
        if self.required {
            self.load().await?;
        }
        Ok(())
    }

    /// Replace the system prompt. Takes effect on the next request.
    pub async fn replace(&self, contents: &str) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, contents).await.map_err(|err| {
            CoreError::Prompt(format!("failed to write {}: {err}", self.path.display()))
        })?;
        info!(
            "system prompt replaced (path={}, len={})",
            self.path.display(),
            contents.len()
        );
        Ok(())
    }

    /// Replace the system prompt with the contents of another file.
    pub async fn replace_from_file(&self, source: impl AsRef<Path>) -> Result<(), CoreError> {
        let source = source.as_ref();
        let contents = tokio::fs::read_to_string(source).await.map_err(|err| {
            CoreError::Prompt(format!("failed to read {}: {err}", source.display()))
        })?;
        if contents.trim().is_empty() {
            return Err(CoreError::Prompt(format!(
                "refusing empty prompt from {}",
                source.display()
            )));
        }
        self.replace(&contents).await
    }
}

/// Message layout for one request: system, replayed history, user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    system: String,
}

/// Build the template for a single request from the current system prompt.
pub fn build_template(system_prompt: &str) -> PromptTemplate {
    PromptTemplate {
        system: system_prompt.trim().to_string(),
    }
}

impl PromptTemplate {
    pub fn system(&self) -> &str {
        &self.system
    }

    /// Substitute `{{name}}` placeholders. Unknown names are left in place.
    pub fn with_variables(mut self, variables: &BTreeMap<String, String>) -> Self {
        if let Some(pattern) = TEMPLATE_VARIABLE.as_ref() {
            self.system = pattern
                .replace_all(&self.system, |caps: &Captures<'_>| {
                    variables
                        .get(&caps[1])
                        .cloned()
                        .unwrap_or_else(|| caps[0].to_string())
                })
                .into_owned();
        }
        self
    }

    /// Lay out `[system, ...history, user]`. An empty system prompt is omitted.
    pub fn render(&self, history: Vec<ChatMessage>, input: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        if !self.system.is_empty() {
            messages.push(ChatMessage {
                role: ChatRole::System,
                message_type: MessageType::Text,
                content: self.system.clone(),
            });
        }
        messages.extend(history);
        messages.push(ChatMessage {
            role: ChatRole::User,
            message_type: MessageType::Text,
            content: input.to_string(),
        });
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_PROMPT, PromptSource, build_template};
    use crate::error::CoreError;
    use autoagents_llm::chat::{ChatMessage, ChatRole, MessageType};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_optional_prompt_uses_builtin() {
        let temp = tempdir().expect("tempdir");
        let source = PromptSource::new(temp.path().join("prompt.md"), false);
        assert_eq!(source.load().await.expect("prompt"), DEFAULT_PROMPT);
    }

    #[tokio::test]
    async fn missing_required_prompt_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let source = PromptSource::new(temp.path().join("prompt.md"), true);
        match source.load().await.expect_err("required") {
            CoreError::Prompt(message) => assert!(message.contains("not found")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn availability_only_matters_for_required_prompts() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("prompt.md");
        PromptSource::new(&path, false)
            .ensure_available()
            .await
            .expect("optional");
        let required = PromptSource::new(&path, true);
        assert!(matches!(
            required.ensure_available().await,
            Err(CoreError::Prompt(_))
        ));
        required.replace("present").await.expect("replace");
        required.ensure_available().await.expect("available");
    }

    #[tokio::test]
    async fn replaced_prompt_is_read_on_next_load() {
        let temp = tempdir().expect("tempdir");
        let source = PromptSource::new(temp.path().join(".sina").join("prompt.md"), true);
        source.replace("first").await.expect("replace");
        assert_eq!(source.load().await.expect("load"), "first");

        let update = temp.path().join("new.md");
        std::fs::write(&update, "second").expect("write");
        source.replace_from_file(&update).await.expect("replace");
        assert_eq!(source.load().await.expect("load"), "second");
    }

    #[tokio::test]
    async fn empty_replacement_is_rejected() {
        let temp = tempdir().expect("tempdir");
        let source = PromptSource::new(temp.path().join("prompt.md"), false);
        let update = temp.path().join("empty.md");
        std::fs::write(&update, "  \n").expect("write");
        assert!(source.replace_from_file(&update).await.is_err());
        assert!(!source.path().exists());
    }

    #[test]
    fn render_orders_system_history_then_input() {
        let history = vec![ChatMessage {
            role: ChatRole::Assistant,
            message_type: MessageType::Text,
            content: "earlier".to_string(),
        }];
        let messages = build_template("  be brief \n").render(history, "what now");
        let layout = messages
            .iter()
            .map(|message| (message.role.clone(), message.content.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            layout,
            vec![
                (ChatRole::System, "be brief"),
                (ChatRole::Assistant, "earlier"),
                (ChatRole::User, "what now"),
            ]
        );
    }

    #[test]
    fn empty_system_prompt_is_omitted() {
        let messages = build_template("").render(Vec::new(), "hi");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, ChatRole::User);
    }

    #[test]
    fn substitutes_known_variables_only() {
        let mut variables = BTreeMap::new();
        variables.insert("cwd".to_string(), "/work".to_string());
        let template = build_template("run in {{ cwd }} on {{os}}").with_variables(&variables);
        assert_eq!(template.system(), "run in /work on {{os}}");
    }
}
