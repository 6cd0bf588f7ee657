use async_trait::async_trait;
use parking_lot::Mutex;
use sina_core::{CommandOutput, CommandRunner, CoreError};
use std::sync::Arc;

/// Command runner that records commands and returns a canned output.
#[derive(Debug, Clone, Default)]
pub struct RecordingRunner {
    output: CommandOutput,
    fail: bool,
    pub commands: Arc<Mutex<Vec<String>>>,
}

impl RecordingRunner {
    pub fn new(output: CommandOutput) -> Self {
        Self {
            output,
            fail: false,
            commands: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Runner whose commands succeed with the given stdout.
    pub fn with_stdout(stdout: impl Into<String>) -> Self {
        Self::new(CommandOutput {
            stdout: stdout.into(),
            stderr: String::new(),
            status_code: Some(0),
        })
    }

    /// Runner that fails every command as if the shell could not be spawned.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn executed(&self) -> Vec<String> {
        self.commands.lock().clone()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &str) -> Result<CommandOutput, CoreError> {
        self.commands.lock().push(command.to_string());
        if self.fail {
            return Err(CoreError::Command("spawn refused".to_string()));
        }
        Ok(self.output.clone())
    }
}
