//! Query and shell agents.
//!
//! Both agents follow the same exchange: read the system prompt, project the
//! logged history, append the user turn, then call the model. The user turn
//! stays in the log when the model call fails; no assistant record is written
//! for a failed exchange.

use crate::error::CoreError;
use crate::projection::{project, window};
use crate::prompt::{PromptSource, build_template};
use crate::response::ShellCommand;
use crate::shell::{CommandOutput, CommandRunner};
use autoagents_llm::LLMProvider;
use autoagents_llm::chat::ChatProvider;
use log::{debug, info, warn};
use sina_history::{ChatHistory, InteractionRecord, Role};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Shared state for one conversational agent.
struct Conversation {
    llm: Arc<dyn LLMProvider>,
    history: ChatHistory,
    prompt: PromptSource,
    window: Option<usize>,
    variables: BTreeMap<String, String>,
}

impl Conversation {
    fn new(llm: Arc<dyn LLMProvider>, history: ChatHistory, prompt: PromptSource) -> Self {
        Self {
            llm,
            history,
            prompt,
            window: None,
            variables: default_variables(),
        }
    }

    async fn exchange(&mut self, input: &str) -> Result<String, CoreError> {
        let system_prompt = self.prompt.load().await?;
        let template = build_template(&system_prompt).with_variables(&self.variables);
        let context = project(window(self.history.records(), self.window));
        self.history.add_message(Role::User, input).await?;

        let messages = template.render(context, input);
        debug!(
            "sending chat request (messages={}, input_len={})",
            messages.len(),
            input.len()
        );
        let response = match self.llm.chat_with_tools(&messages, None, None).await {
            Ok(response) => response,
            Err(err) => {
                warn!("model call failed; user turn kept without reply: {err}");
                return Err(CoreError::Completion(err.to_string()));
            }
        };
        match response.text() {
            Some(text) => Ok(text),
            None => {
                warn!("model reply carried no text; user turn kept without reply");
                Err(CoreError::Completion("empty model reply".to_string()))
            }
        }
    }
}

fn default_variables() -> BTreeMap<String, String> {
    let mut variables = BTreeMap::new();
    variables.insert("os".to_string(), std::env::consts::OS.to_string());
    variables.insert("shell".to_string(), "sh".to_string());
    variables.insert(
        "date".to_string(),
        chrono::Utc::now().format("%Y-%m-%d").to_string(),
    );
    if let Ok(cwd) = std::env::current_dir() {
        variables.insert("cwd".to_string(), cwd.display().to_string());
    }
    variables
}

/// Free-form question answering over the interaction log.
pub struct QueryAgent {
    conversation: Conversation,
}

impl QueryAgent {
    pub fn new(llm: Arc<dyn LLMProvider>, history: ChatHistory, prompt: PromptSource) -> Self {
        Self {
            conversation: Conversation::new(llm, history, prompt),
        }
    }

    /// Limit how many logged records are replayed as context.
    pub fn with_window(mut self, window: Option<usize>) -> Self {
        self.conversation.window = window;
        self
    }

    /// Add or override a `{{name}}` prompt variable.
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.conversation.variables.insert(name.into(), value.into());
        self
    }

    /// Ask the model and log both turns.
    pub async fn query(&mut self, input: &str) -> Result<String, CoreError> {
        let reply = self.conversation.exchange(input).await?;
        self.conversation
            .history
            .add_message(Role::Assistant, reply.as_str())
            .await?;
        info!("query answered (reply_len={})", reply.len());
        Ok(reply)
    }

    /// Replace the system prompt used from the next query on.
    pub async fn update_prompt(&self, contents: &str) -> Result<(), CoreError> {
        self.conversation.prompt.replace(contents).await
    }

    pub fn history(&self) -> &ChatHistory {
        &self.conversation.history
    }

    pub fn history_mut(&mut self) -> &mut ChatHistory {
        &mut self.conversation.history
    }
}

/// Result of one shell agent turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellOutcome {
    pub command: ShellCommand,
    /// `None` for dry runs and replies without a runnable command.
    pub output: Option<CommandOutput>,
}

/// Turns requests into shell commands and runs them.
pub struct ShellAgent {
    conversation: Conversation,
    runner: Arc<dyn CommandRunner>,
    record_output: bool,
    max_output_chars: usize,
}

impl ShellAgent {
    pub fn new(
        llm: Arc<dyn LLMProvider>,
        history: ChatHistory,
        prompt: PromptSource,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            conversation: Conversation::new(llm, history, prompt),
            runner,
            record_output: true,
            max_output_chars: 4000,
        }
    }

    pub fn with_window(mut self, window: Option<usize>) -> Self {
        self.conversation.window = window;
        self
    }

    /// Control whether command output is logged as a system record.
    pub fn with_output_recording(mut self, record_output: bool, max_output_chars: usize) -> Self {
        self.record_output = record_output;
        self.max_output_chars = max_output_chars;
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.conversation.variables.insert(name.into(), value.into());
        self
    }

    /// Ask the model for a command and run it unless `dry_run` is set.
    pub async fn run(&mut self, input: &str, dry_run: bool) -> Result<ShellOutcome, CoreError> {
        let reply = self.conversation.exchange(input).await?;
        let command = ShellCommand::parse(&reply)?;
        let history = &mut self.conversation.history;

        if !command.is_runnable() {
            let reason = command
                .error
                .clone()
                .unwrap_or_else(|| "no command returned".to_string());
            history
                .add_message(Role::Assistant, format!("error: {reason}"))
                .await?;
            info!("model returned no command (reason={reason})");
            return Ok(ShellOutcome {
                command,
                output: None,
            });
        }

        history
            .add_message(Role::Assistant, command.command.as_str())
            .await?;
        if dry_run {
            info!("dry run, command not executed (len={})", command.command.len());
            return Ok(ShellOutcome {
                command,
                output: None,
            });
        }

        let output = self.runner.run(&command.command).await?;
        if self.record_output {
            self.conversation
                .history
                .add_message(Role::System, output.summary(self.max_output_chars))
                .await?;
        }
        info!(
            "command executed (status={:?}, stdout_len={})",
            output.status_code,
            output.stdout.len()
        );
        Ok(ShellOutcome {
            command,
            output: Some(output),
        })
    }

    /// Logged commands, oldest first.
    pub fn commands(&self) -> Vec<InteractionRecord> {
        self.conversation
            .history
            .records()
            .iter()
            .filter(|record| record.role == Role::Assistant && !record.content.starts_with("error: "))
            .cloned()
            .collect()
    }

    pub fn history(&self) -> &ChatHistory {
        &self.conversation.history
    }

    pub fn history_mut(&mut self) -> &mut ChatHistory {
        &mut self.conversation.history
    }
}
