//! Configuration schema for SINA.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root config for the SINA agents and CLI.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SinaConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub shell: ShellConfig,
}

impl SinaConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> SinaConfigBuilder {
        SinaConfigBuilder::new()
    }
}

/// Builder for assembling a `SinaConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct SinaConfigBuilder {
    config: SinaConfig,
}

impl SinaConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: SinaConfig::default(),
        }
    }

    /// Replace the model provider configuration.
    pub fn llm(mut self, llm: LlmConfig) -> Self {
        self.config.llm = llm;
        self
    }

    /// Replace the history configuration.
    pub fn history(mut self, history: HistoryConfig) -> Self {
        self.config.history = history;
        self
    }

    /// Replace the prompt source configuration.
    pub fn prompt(mut self, prompt: PromptConfig) -> Self {
        self.config.prompt = prompt;
        self
    }

    /// Replace the shell execution configuration.
    pub fn shell(mut self, shell: ShellConfig) -> Self {
        self.config.shell = shell;
        self
    }

    /// Finalize and return the built `SinaConfig`.
    pub fn build(self) -> SinaConfig {
        self.config
    }
}

/// Model provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
        }
    }
}

impl LlmConfig {
    /// Resolve the API key from the process environment.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        self.api_key_with(|name| std::env::var(name).ok())
    }

    /// Resolve the API key through a custom lookup.
    pub fn api_key_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<String, ConfigError> {
        lookup(&self.api_key_env)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ConfigError::MissingCredential {
                env: self.api_key_env.clone(),
            })
    }
}

fn default_llm_provider() -> String {
    "anthropic".to_string()
}

fn default_llm_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    8192
}

/// Interaction log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_path")]
    pub path: PathBuf,
    /// Maximum number of records replayed as context; `None` replays everything.
    #[serde(default)]
    pub window: Option<usize>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_history_path(),
            window: None,
        }
    }
}

fn default_history_path() -> PathBuf {
    PathBuf::from(".history/chat_history.json")
}

/// System instruction source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "default_prompt_path")]
    pub path: PathBuf,
    /// Fail instead of falling back to the built-in prompt when the file is missing.
    #[serde(default)]
    pub required: bool,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            path: default_prompt_path(),
            required: false,
        }
    }
}

fn default_prompt_path() -> PathBuf {
    PathBuf::from(".sina/prompt.md")
}

/// Shell command execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    #[serde(default = "default_shell_program")]
    pub program: String,
    /// Log command output as a system record after each run.
    #[serde(default = "default_record_output")]
    pub record_output: bool,
    /// Upper bound on logged output characters.
    #[serde(default = "default_max_output_chars")]
    pub max_output_chars: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            program: default_shell_program(),
            record_output: default_record_output(),
            max_output_chars: default_max_output_chars(),
        }
    }
}

fn default_shell_program() -> String {
    "sh".to_string()
}

fn default_record_output() -> bool {
    true
}

fn default_max_output_chars() -> usize {
    4000
}
