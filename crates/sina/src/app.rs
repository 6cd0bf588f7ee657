//! Wiring from configuration to agents, and the command handlers.

use crate::cli::{Cli, HistoryCommand};
use anyhow::{Context, Result, bail};
use autoagents_llm::LLMProvider;
use autoagents_llm::backends::anthropic::Anthropic;
use autoagents_llm::builder::LLMBuilder;
use log::{debug, info};
use sina_config::{LayeredConfigOptions, LlmConfig, SinaConfig};
use sina_core::{PromptSource, QueryAgent, ShellAgent, ShellOutcome, ShellRunner};
use sina_history::{ChatHistory, InteractionRecord};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Resolve the effective config from the discovered layers and CLI overrides.
pub fn load_config(cli: &Cli) -> Result<SinaConfig> {
    let cwd = std::env::current_dir().context("failed to resolve current working directory")?;
    let mut options = LayeredConfigOptions::new(&cwd);
    if let Some(path) = cli.config.as_ref() {
        options = options.with_runtime_path(path);
    }
    let layered =
        SinaConfig::load_layered_with_options(options).context("failed to load config")?;
    debug!("config layers loaded (layers={})", layered.layers.len());

    let mut config = layered.config;
    if let Some(path) = cli.history.as_ref() {
        config.history.path = path.clone();
    }
    if let Some(model) = cli.model.as_ref() {
        config.llm.model = model.clone();
    }
    Ok(config)
}

/// Build the model provider. Fails when the API key is missing.
pub fn build_llm(config: &LlmConfig) -> Result<Arc<dyn LLMProvider>> {
    let api_key = config
        .api_key()
        .context("an API key is required for model requests")?;
    info!(
        "building LLM provider (provider={}, model={})",
        config.provider, config.model
    );
    let llm: Arc<dyn LLMProvider> = LLMBuilder::<Anthropic>::new()
        .api_key(api_key)
        .model(config.model.clone())
        .max_tokens(config.max_tokens)
        .temperature(config.temperature)
        .build()
        .context("failed to build Anthropic LLM provider")?;
    Ok(llm)
}

pub async fn open_history(config: &SinaConfig) -> ChatHistory {
    ChatHistory::open_path(&config.history.path).await
}

/// Prompt source for the agents. A required prompt that is missing stops
/// startup before any request is served.
async fn checked_prompt(config: &SinaConfig) -> Result<PromptSource> {
    let prompt = PromptSource::from_config(&config.prompt);
    prompt
        .ensure_available()
        .await
        .context("system prompt is not available")?;
    Ok(prompt)
}

pub async fn query_agent(
    config: &SinaConfig,
    llm: Arc<dyn LLMProvider>,
    history: ChatHistory,
) -> Result<QueryAgent> {
    let prompt = checked_prompt(config).await?;
    Ok(QueryAgent::new(llm, history, prompt).with_window(config.history.window))
}

pub async fn shell_agent(
    config: &SinaConfig,
    llm: Arc<dyn LLMProvider>,
    history: ChatHistory,
) -> Result<ShellAgent> {
    let prompt = checked_prompt(config).await?;
    let runner = ShellRunner::from_config(&config.shell);
    let shell = runner.program().to_string();
    Ok(ShellAgent::new(llm, history, prompt, Arc::new(runner))
        .with_window(config.history.window)
        .with_output_recording(config.shell.record_output, config.shell.max_output_chars)
        .with_variable("shell", shell))
}

pub async fn update_prompt(config: &SinaConfig, path: &Path) -> Result<()> {
    let source = PromptSource::from_config(&config.prompt);
    source
        .replace_from_file(path)
        .await
        .with_context(|| format!("failed to update prompt from {}", path.display()))?;
    eprintln!("System prompt updated: {}", source.path().display());
    Ok(())
}

/// Print one shell agent turn: explanation to stderr, command output to the
/// matching stream. Returns the command's exit status when it ran.
pub fn report_outcome(
    outcome: &ShellOutcome,
    dry_run: bool,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<Option<i32>> {
    if let Some(reason) = outcome.command.error.as_deref() {
        writeln!(err, "error: {reason}")?;
    }
    if !outcome.command.is_runnable() {
        return Ok(None);
    }
    if !outcome.command.explanation.is_empty() {
        writeln!(err, "{}", outcome.command.explanation)?;
    }
    if dry_run {
        writeln!(out, "{}", outcome.command.command)?;
        return Ok(None);
    }
    writeln!(err, "$ {}", outcome.command.command)?;
    let Some(output) = outcome.output.as_ref() else {
        return Ok(None);
    };
    write!(out, "{}", output.stdout)?;
    write!(err, "{}", output.stderr)?;
    Ok(output.status_code)
}

/// Handle `history …` subcommands.
pub async fn run_history(
    command: &HistoryCommand,
    history: &mut ChatHistory,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        HistoryCommand::List(args) => {
            let records = match args.limit {
                Some(limit) => history.last(limit),
                None => history.get_history(),
            };
            write_records(&records, out)?;
        }
        HistoryCommand::Search { text } => {
            write_records(&history.search_history(text), out)?;
        }
        HistoryCommand::Export { format } => {
            let exported = history
                .export_history(*format)
                .with_context(|| format!("failed to export history as {format}"))?;
            writeln!(out, "{exported}")?;
        }
        HistoryCommand::Clear => {
            let removed = history.clear().await.context("failed to clear history")?;
            writeln!(out, "Removed {removed} records from {}", history.location())?;
        }
    }
    Ok(())
}

fn write_records(records: &[InteractionRecord], out: &mut impl Write) -> Result<()> {
    for record in records {
        writeln!(
            out,
            "{} [{}] {}",
            record.created_at.to_rfc3339(),
            record.role,
            record.content
        )?;
    }
    Ok(())
}

/// Reject empty requests before anything is logged.
pub fn require_text(text: &str) -> Result<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        bail!("request text must not be empty");
    }
    Ok(trimmed)
}
