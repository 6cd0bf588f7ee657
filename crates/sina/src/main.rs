mod app;
mod cli;
mod interactive;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command, join_text};
use log::info;
use std::process::ExitCode;

/// Entry point for the SINA command-line client.
#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();

    let cli = Cli::parse();
    info!(
        "starting sina (config_set={}, history_set={}, model_set={})",
        cli.config.is_some(),
        cli.history.is_some(),
        cli.model.is_some()
    );
    let config = app::load_config(&cli)?;
    let stdout = std::io::stdout();
    let stderr = std::io::stderr();

    match &cli.command {
        Command::Query { text } => {
            let text = join_text(text);
            let input = app::require_text(&text)?;
            let llm = app::build_llm(&config.llm)?;
            let history = app::open_history(&config).await;
            let mut agent = app::query_agent(&config, llm, history).await?;
            let reply = agent.query(input).await.context("query failed")?;
            println!("{reply}");
        }
        Command::UpdatePrompt { path } => {
            app::update_prompt(&config, path).await?;
        }
        Command::Exec { dry_run, text } => {
            let text = join_text(text);
            let input = app::require_text(&text)?;
            let llm = app::build_llm(&config.llm)?;
            let history = app::open_history(&config).await;
            let mut agent = app::shell_agent(&config, llm, history).await?;
            let outcome = agent
                .run(input, *dry_run)
                .await
                .context("command request failed")?;
            let status = app::report_outcome(
                &outcome,
                *dry_run,
                &mut stdout.lock(),
                &mut stderr.lock(),
            )?;
            if !outcome.command.is_runnable() {
                return Ok(ExitCode::FAILURE);
            }
            return Ok(exit_code(status));
        }
        Command::Interactive => {
            let llm = app::build_llm(&config.llm)?;
            let history = app::open_history(&config).await;
            let mut agent = app::shell_agent(&config, llm, history).await?;
            let reader = tokio::io::BufReader::new(tokio::io::stdin());
            interactive::run_session(&mut agent, reader, &mut stdout.lock(), &mut stderr.lock())
                .await?;
        }
        Command::History(command) => {
            let mut history = app::open_history(&config).await;
            app::run_history(command, &mut history, &mut stdout.lock()).await?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn exit_code(status: Option<i32>) -> ExitCode {
    match status {
        None | Some(0) => ExitCode::SUCCESS,
        Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
    }
}
