use autoagents_llm::chat::ChatRole;
use pretty_assertions::assert_eq;
use sina_core::{CoreError, PromptSource, QueryAgent, ShellAgent};
use sina_history::{ChatHistory, InteractionRecord, Role};
use sina_test_utils::{
    FailingLLM, FailingStore, FixedLLM, MemoryStore, RecordingChatLLM, RecordingRunner,
    ScriptedLLM,
};
use std::sync::Arc;
use tempfile::tempdir;

fn roles(history: &ChatHistory) -> Vec<Role> {
    history.records().iter().map(|record| record.role).collect()
}

async fn prompt_in(dir: &std::path::Path, contents: &str) -> PromptSource {
    let source = PromptSource::new(dir.join("prompt.md"), true);
    source.replace(contents).await.expect("prompt");
    source
}

#[tokio::test]
async fn query_logs_both_turns_and_replays_history() {
    let temp = tempdir().expect("tempdir");
    let prompt = prompt_in(temp.path(), "You are an architect.").await;
    let llm = ScriptedLLM::new(["first answer", "second answer"]);
    let history = ChatHistory::open(Arc::new(MemoryStore::new())).await;
    let mut agent = QueryAgent::new(Arc::new(llm.clone()), history, prompt);

    assert_eq!(agent.query("first question").await.expect("query"), "first answer");
    assert_eq!(
        agent.query("second question").await.expect("query"),
        "second answer"
    );

    assert_eq!(
        roles(agent.history()),
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
    let requests = llm.requests.lock().clone();
    let second = requests[1]
        .iter()
        .map(|message| (message.role.clone(), message.content.clone()))
        .collect::<Vec<_>>();
    assert_eq!(
        second,
        vec![
            (ChatRole::System, "You are an architect.".to_string()),
            (ChatRole::User, "first question".to_string()),
            (ChatRole::Assistant, "first answer".to_string()),
            (ChatRole::User, "second question".to_string()),
        ]
    );
}

#[tokio::test]
async fn window_limits_replayed_history() {
    let temp = tempdir().expect("tempdir");
    let prompt = prompt_in(temp.path(), "system").await;
    let llm = RecordingChatLLM::new("ok");
    let history = ChatHistory::open(Arc::new(MemoryStore::new())).await;
    let mut agent = QueryAgent::new(Arc::new(llm.clone()), history, prompt).with_window(Some(1));

    agent.query("one").await.expect("query");
    agent.query("two").await.expect("query");

    let messages = llm.last_messages.lock().clone();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].role, ChatRole::Assistant);
    assert_eq!(messages[2].content, "two");
}

#[tokio::test]
async fn failed_completion_keeps_user_turn_only() {
    let temp = tempdir().expect("tempdir");
    let prompt = prompt_in(temp.path(), "system").await;
    let store = MemoryStore::new();
    let history = ChatHistory::open(Arc::new(store.clone())).await;
    let mut agent = QueryAgent::new(Arc::new(FailingLLM::new("rate limited")), history, prompt);

    match agent.query("hello").await.expect_err("completion failure") {
        CoreError::Completion(message) => assert!(message.contains("rate limited")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(roles(agent.history()), vec![Role::User]);
    assert_eq!(store.persisted().expect("persisted").len(), 1);
}

#[tokio::test]
async fn reply_without_text_is_a_completion_error() {
    let temp = tempdir().expect("tempdir");
    let prompt = prompt_in(temp.path(), "system").await;
    let history = ChatHistory::open(Arc::new(MemoryStore::new())).await;
    let mut agent = QueryAgent::new(Arc::new(FixedLLM::without_text()), history, prompt);

    match agent.query("hello").await.expect_err("empty reply") {
        CoreError::Completion(message) => assert_eq!(message, "empty model reply"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(roles(agent.history()), vec![Role::User]);
}

#[tokio::test]
async fn persisted_records_are_replayed_as_context() {
    let temp = tempdir().expect("tempdir");
    let prompt = prompt_in(temp.path(), "system").await;
    let now = chrono::Utc::now();
    let store = MemoryStore::with_records(vec![
        InteractionRecord::new(Role::User, "earlier question", now),
        InteractionRecord::new(Role::Assistant, "earlier answer", now),
    ]);
    let llm = RecordingChatLLM::new("ok");
    let history = ChatHistory::open(Arc::new(store.clone())).await;
    let mut agent = QueryAgent::new(Arc::new(llm.clone()), history, prompt);

    agent.query("follow up").await.expect("query");
    let contents = llm
        .last_messages
        .lock()
        .iter()
        .map(|message| message.content.clone())
        .collect::<Vec<_>>();
    assert_eq!(
        contents,
        vec!["system", "earlier question", "earlier answer", "follow up"]
    );
    assert_eq!(store.write_count(), 2);
    assert_eq!(store.persisted().expect("persisted").len(), 4);
}

#[tokio::test]
async fn history_write_failure_aborts_before_model_call() {
    let temp = tempdir().expect("tempdir");
    let prompt = prompt_in(temp.path(), "system").await;
    let store = FailingStore::new();
    store.set_failing(true);
    let llm = ScriptedLLM::new(["never used"]);
    let history = ChatHistory::open(Arc::new(store)).await;
    let mut agent = QueryAgent::new(Arc::new(llm.clone()), history, prompt);

    assert!(matches!(
        agent.query("hello").await,
        Err(CoreError::History(_))
    ));
    assert_eq!(llm.request_count(), 0);
    assert!(agent.history().is_empty());
}

#[tokio::test]
async fn prompt_update_applies_to_next_query() {
    let temp = tempdir().expect("tempdir");
    let prompt = prompt_in(temp.path(), "old prompt").await;
    let llm = RecordingChatLLM::new("ok");
    let history = ChatHistory::open(Arc::new(MemoryStore::new())).await;
    let mut agent = QueryAgent::new(Arc::new(llm.clone()), history, prompt);

    agent.update_prompt("new prompt").await.expect("update");
    agent.query("hi").await.expect("query");
    assert_eq!(llm.last_messages.lock()[0].content, "new prompt");
}

#[tokio::test]
async fn shell_agent_runs_command_and_logs_output() {
    let temp = tempdir().expect("tempdir");
    let prompt = prompt_in(temp.path(), "Use {{shell}}.").await;
    let llm = RecordingChatLLM::new(r#"{"command":"ls","explanation":"list files"}"#);
    let runner = RecordingRunner::with_stdout("a.txt\n");
    let history = ChatHistory::open(Arc::new(MemoryStore::new())).await;
    let mut agent = ShellAgent::new(
        Arc::new(llm.clone()),
        history,
        prompt,
        Arc::new(runner.clone()),
    )
    .with_variable("shell", "bash");

    let outcome = agent.run("list files", false).await.expect("run");
    assert_eq!(outcome.command.command, "ls");
    assert_eq!(outcome.command.explanation, "list files");
    assert_eq!(outcome.output.expect("output").stdout, "a.txt\n");
    assert_eq!(runner.executed(), vec!["ls".to_string()]);
    assert_eq!(llm.last_messages.lock()[0].content, "Use bash.");

    let records = agent.history().get_history();
    assert_eq!(
        roles(agent.history()),
        vec![Role::User, Role::Assistant, Role::System]
    );
    assert_eq!(records[1].content, "ls");
    assert!(records[2].content.contains("stdout:\na.txt"));
    assert_eq!(agent.commands().len(), 1);
}

#[tokio::test]
async fn dry_run_does_not_execute() {
    let temp = tempdir().expect("tempdir");
    let prompt = prompt_in(temp.path(), "system").await;
    let runner = RecordingRunner::with_stdout("");
    let history = ChatHistory::open(Arc::new(MemoryStore::new())).await;
    let mut agent = ShellAgent::new(
        Arc::new(RecordingChatLLM::new("rm -rf build")),
        history,
        prompt,
        Arc::new(runner.clone()),
    );

    let outcome = agent.run("clean the build", true).await.expect("run");
    assert_eq!(outcome.command.command, "rm -rf build");
    assert_eq!(outcome.output, None);
    assert!(runner.executed().is_empty());
    assert_eq!(roles(agent.history()), vec![Role::User, Role::Assistant]);
}

#[tokio::test]
async fn refused_request_is_logged_without_running() {
    let temp = tempdir().expect("tempdir");
    let prompt = prompt_in(temp.path(), "system").await;
    let runner = RecordingRunner::with_stdout("");
    let history = ChatHistory::open(Arc::new(MemoryStore::new())).await;
    let mut agent = ShellAgent::new(
        Arc::new(RecordingChatLLM::new(
            r#"{"command":"","explanation":"","error":"unsafe request"}"#,
        )),
        history,
        prompt,
        Arc::new(runner.clone()),
    );

    let outcome = agent.run("wipe the disk", false).await.expect("run");
    assert!(!outcome.command.is_runnable());
    assert!(runner.executed().is_empty());
    assert_eq!(
        agent.history().get_history()[1].content,
        "error: unsafe request"
    );
    assert!(agent.commands().is_empty());
}

#[tokio::test]
async fn output_recording_can_be_disabled() {
    let temp = tempdir().expect("tempdir");
    let prompt = prompt_in(temp.path(), "system").await;
    let history = ChatHistory::open(Arc::new(MemoryStore::new())).await;
    let mut agent = ShellAgent::new(
        Arc::new(RecordingChatLLM::new("pwd")),
        history,
        prompt,
        Arc::new(RecordingRunner::with_stdout("/tmp\n")),
    )
    .with_output_recording(false, 100);

    agent.run("where am I", false).await.expect("run");
    assert_eq!(roles(agent.history()), vec![Role::User, Role::Assistant]);
}

#[tokio::test]
async fn runner_failure_surfaces_after_logging_command() {
    let temp = tempdir().expect("tempdir");
    let prompt = prompt_in(temp.path(), "system").await;
    let history = ChatHistory::open(Arc::new(MemoryStore::new())).await;
    let mut agent = ShellAgent::new(
        Arc::new(RecordingChatLLM::new("uptime")),
        history,
        prompt,
        Arc::new(RecordingRunner::failing()),
    );

    assert!(matches!(
        agent.run("how long has this been up", false).await,
        Err(CoreError::Command(_))
    ));
    assert_eq!(roles(agent.history()), vec![Role::User, Role::Assistant]);
}

#[tokio::test]
async fn required_prompt_missing_fails_before_logging() {
    let temp = tempdir().expect("tempdir");
    let prompt = PromptSource::new(temp.path().join("absent.md"), true);
    let history = ChatHistory::open(Arc::new(MemoryStore::new())).await;
    let mut agent = QueryAgent::new(Arc::new(RecordingChatLLM::new("ok")), history, prompt);

    assert!(matches!(
        agent.query("hi").await,
        Err(CoreError::Prompt(_))
    ));
    assert!(agent.history().is_empty());
}
