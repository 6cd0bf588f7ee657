//! Line-oriented interactive session for the shell agent.

use crate::app::report_outcome;
use anyhow::Result;
use log::{info, warn};
use sina_core::ShellAgent;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

const BANNER: &str = "SINA interactive mode. Type `history` to list commands, `exit` to quit.";
const PROMPT: &str = "sina> ";

/// Read requests line by line until `exit` or end of input.
///
/// A failed turn is reported on `err` and the session continues.
pub async fn run_session<R>(
    agent: &mut ShellAgent,
    reader: R,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    writeln!(err, "{BANNER}")?;
    let mut lines = reader.lines();
    let mut turns = 0usize;
    loop {
        write!(err, "{PROMPT}")?;
        err.flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        match input.to_ascii_lowercase().as_str() {
            "" => continue,
            "exit" | "quit" => break,
            "history" => {
                for record in agent.commands() {
                    writeln!(out, "{}: {}", record.created_at.to_rfc3339(), record.content)?;
                }
                continue;
            }
            _ => {}
        }

        turns += 1;
        match agent.run(input, false).await {
            Ok(outcome) => {
                report_outcome(&outcome, false, out, err)?;
            }
            Err(error) => {
                warn!("interactive turn failed (turn={turns}): {error}");
                writeln!(err, "error: {error}")?;
            }
        }
        out.flush()?;
    }
    info!("interactive session ended (turns={turns})");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::run_session;
    use pretty_assertions::assert_eq;
    use sina_core::{PromptSource, ShellAgent};
    use sina_history::{ChatHistory, Role};
    use sina_test_utils::{MemoryStore, RecordingRunner, ScriptedLLM};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn session_runs_turns_and_survives_failures() {
        let temp = tempdir().expect("tempdir");
        let prompt = PromptSource::new(temp.path().join("prompt.md"), false);
        // second request exhausts the script and fails
        let llm = ScriptedLLM::new([r#"{"command":"ls","explanation":"list"}"#]);
        let runner = RecordingRunner::with_stdout("a.txt\n");
        let history = ChatHistory::open(Arc::new(MemoryStore::new())).await;
        let mut agent = ShellAgent::new(Arc::new(llm), history, prompt, Arc::new(runner.clone()));

        let input: &[u8] = b"list files\n\nagain\nHistory\nEXIT\nnever read\n";
        let (mut out, mut err) = (Vec::new(), Vec::new());
        run_session(&mut agent, input, &mut out, &mut err)
            .await
            .expect("session");

        assert_eq!(runner.executed(), vec!["ls".to_string()]);
        let out = String::from_utf8(out).expect("utf8");
        let lines = out.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "a.txt");
        assert!(lines[1].ends_with(": ls"));
        assert_eq!(lines.len(), 2);
        assert!(String::from_utf8(err).expect("utf8").contains("error: "));

        let roles = agent
            .history()
            .records()
            .iter()
            .map(|record| record.role)
            .collect::<Vec<_>>();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::System, Role::User]
        );
    }

    #[tokio::test]
    async fn session_ends_at_end_of_input() {
        let temp = tempdir().expect("tempdir");
        let prompt = PromptSource::new(temp.path().join("prompt.md"), false);
        let history = ChatHistory::open(Arc::new(MemoryStore::new())).await;
        let mut agent = ShellAgent::new(
            Arc::new(ScriptedLLM::new(Vec::<String>::new())),
            history,
            prompt,
            Arc::new(RecordingRunner::with_stdout("")),
        );
        let (mut out, mut err) = (Vec::new(), Vec::new());
        run_session(&mut agent, &b""[..], &mut out, &mut err)
            .await
            .expect("session");
        assert!(out.is_empty());
        assert!(agent.history().is_empty());
    }
}
