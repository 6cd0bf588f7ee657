//! Shell command execution.

use crate::error::CoreError;
use async_trait::async_trait;
use log::debug;
use sina_config::ShellConfig;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Captured result of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` when terminated by a signal.
    pub status_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status_code == Some(0)
    }

    /// Log-friendly summary capped at `max_chars` characters.
    pub fn summary(&self, max_chars: usize) -> String {
        let status = match self.status_code {
            Some(code) => code.to_string(),
            None => "signal".to_string(),
        };
        let mut note = format!("exit status: {status}");
        if !self.stdout.is_empty() {
            note.push_str("\nstdout:\n");
            note.push_str(&self.stdout);
        }
        if !self.stderr.is_empty() {
            note.push_str("\nstderr:\n");
            note.push_str(&self.stderr);
        }
        truncate_chars(note, max_chars)
    }
}

fn truncate_chars(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => {
            let mut truncated = text[..idx].to_string();
            truncated.push_str("\n[truncated]");
            truncated
        }
        None => text,
    }
}

/// Executes shell commands on behalf of the shell agent.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> Result<CommandOutput, CoreError>;
}

/// Runs commands through `<program> -c <command>`.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    program: String,
    cwd: Option<PathBuf>,
}

impl ShellRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            cwd: None,
        }
    }

    pub fn from_config(config: &ShellConfig) -> Self {
        Self::new(config.program.clone())
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new("sh")
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> Result<CommandOutput, CoreError> {
        debug!(
            "running shell command (program={}, len={})",
            self.program,
            command.len()
        );
        let mut process = Command::new(&self.program);
        process.arg("-c").arg(command);
        if let Some(cwd) = &self.cwd {
            process.current_dir(cwd);
        }
        process.stdin(Stdio::null());
        let output = process
            .output()
            .await
            .map_err(|err| CoreError::Command(format!("failed to spawn {}: {err}", self.program)))?;
        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status_code: output.status.code(),
        };
        debug!(
            "shell command finished (status={:?}, stdout_len={}, stderr_len={})",
            result.status_code,
            result.stdout.len(),
            result.stderr.len()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandOutput, CommandRunner, ShellRunner};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_stdout_stderr_and_status() {
        let output = ShellRunner::default()
            .run("echo out; echo err 1>&2; exit 3")
            .await
            .expect("run");
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
        assert_eq!(output.status_code, Some(3));
        assert!(!output.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_in_configured_directory() {
        let temp = tempdir().expect("tempdir");
        std::fs::write(temp.path().join("marker.txt"), "").expect("write");
        let output = ShellRunner::new("sh")
            .with_cwd(temp.path())
            .run("ls")
            .await
            .expect("run");
        assert!(output.stdout.contains("marker.txt"));
    }

    #[tokio::test]
    async fn missing_program_is_a_command_error() {
        let err = ShellRunner::new("definitely-not-a-shell-binary")
            .run("true")
            .await
            .expect_err("spawn");
        assert!(err.to_string().contains("failed to spawn"));
    }

    #[test]
    fn summary_truncates_by_characters() {
        let output = CommandOutput {
            stdout: "ééééé".to_string(),
            stderr: String::new(),
            status_code: Some(0),
        };
        assert_eq!(output.summary(1000), "exit status: 0\nstdout:\nééééé");
        let short = output.summary(16);
        assert!(short.starts_with("exit status: 0\ns"));
        assert!(short.ends_with("[truncated]"));
    }
}
