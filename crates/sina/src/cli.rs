//! Command-line surface.

use clap::{Args, Parser, Subcommand};
use sina_history::ExportFormat;
use std::path::PathBuf;

/// Shell-integrated agent with a persistent interaction log.
#[derive(Debug, Parser)]
#[command(name = "sina", version)]
pub struct Cli {
    /// Extra sina.json5 applied on top of the discovered config layers
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// History file, overriding `history.path`
    #[arg(long, global = true)]
    pub history: Option<PathBuf>,
    /// Model name, overriding `llm.model`
    #[arg(long, global = true)]
    pub model: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ask a free-form question with the logged history as context
    Query {
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// Replace the system prompt with the contents of a file
    UpdatePrompt { path: PathBuf },
    /// Turn a request into a shell command and run it
    Exec {
        /// Print the command without running it
        #[arg(long)]
        dry_run: bool,
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// Read requests from stdin until `exit`
    Interactive,
    /// Inspect or manage the interaction log
    #[command(subcommand)]
    History(HistoryCommand),
}

#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// Print logged records, oldest first
    List(ListArgs),
    /// Print records whose content contains the text (case-insensitive)
    Search { text: String },
    /// Write the whole log to stdout
    Export {
        #[arg(long, default_value = "json", value_parser = parse_format)]
        format: ExportFormat,
    },
    /// Delete every logged record
    Clear,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only the most recent N records
    #[arg(long)]
    pub limit: Option<usize>,
}

fn parse_format(value: &str) -> Result<ExportFormat, String> {
    value.parse::<ExportFormat>().map_err(|err| err.to_string())
}

/// Join trailing words into one request.
pub fn join_text(words: &[String]) -> String {
    words.join(" ")
}
