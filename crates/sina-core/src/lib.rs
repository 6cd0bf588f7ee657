//! Agent runtime for SINA.
//!
//! This crate owns the context projection from the interaction log, the
//! system prompt source and template, the shell command runner, and the two
//! agents (query and shell) built on top of them.

pub mod agent;
pub mod error;
pub mod projection;
pub mod prompt;
pub mod response;
pub mod shell;

pub use agent::{QueryAgent, ShellAgent, ShellOutcome};
pub use error::CoreError;
pub use projection::{project, window};
pub use prompt::{DEFAULT_PROMPT, PromptSource, PromptTemplate, build_template};
pub use response::ShellCommand;
pub use shell::{CommandOutput, CommandRunner, ShellRunner};
