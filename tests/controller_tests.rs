//! Tests for the conversation loop controller.

mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;

use common::{EventLog, ScriptedModel};
use ticket_agent::agent_loop::{
    ConversationController, ConversationState, FinalAnswerPolicy, LoopEvent, Phase, QueuedInput,
    TerminationReason,
};
use ticket_agent::config::JiraCredentials;
use ticket_agent::error::{AgentError, ToolError};
use ticket_agent::executor::{ExecutionPolicy, ToolExecutor};
use ticket_agent::stop::CompletionSignature;
use ticket_agent::tools::builtin::{create_jira_ticket_tool, update_issue_tool, IssueTracker};
use ticket_agent::tools::{ParameterSchema, Tool, ToolResponse, ToolSet, ToolSpec};
use ticket_agent::types::{ConversationHistory, IssueDraft, IssueRecord, Message, ToolCall};

struct FakeTracker;

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn create_issue(
        &self,
        _credentials: &JiraCredentials,
        record: &IssueRecord,
    ) -> ticket_agent::error::Result<String> {
        Ok(format!("{}-42", record.project_key))
    }
}

fn jira_set() -> ToolSet {
    let creds = JiraCredentials::new("https://acme.atlassian.net", "bot", "token");
    ToolSet::default()
        .with(update_issue_tool())
        .with(create_jira_ticket_tool(Arc::new(FakeTracker), creds))
}

fn fast_executor(budget: u32) -> ToolExecutor {
    ToolExecutor::new(
        ExecutionPolicy::new(Duration::from_secs(1), budget)
            .with_backoff(ticket_agent::util::retry::Backoff::constant(Duration::ZERO)),
    )
}

fn failing_tool(attempts: Arc<AtomicU32>) -> Arc<dyn Tool> {
    Arc::new(ToolSpec::new(
        "flaky",
        "Always fails remotely",
        ParameterSchema::empty(),
        move |_args, _ctx| {
            let attempts = Arc::clone(&attempts);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(ToolError::remote_status("flaky", 503, "unavailable"))
            }
        },
    ))
}

fn controller(model: &Arc<ScriptedModel>, tools: ToolSet) -> ConversationController {
    ConversationController::new(model.clone(), tools).with_executor(fast_executor(3))
}

#[tokio::test]
async fn matching_tool_result_terminates_without_model_call() {
    let history: ConversationHistory = [
        Message::user("file it"),
        Message::tool_request(ToolCall::new("c1", "create_jira_ticket", json!({}))),
        Message::tool_result("c1", "Issue created: https://acme.atlassian.net/browse/OPS-1", true),
    ]
    .into_iter()
    .collect();
    let mut state = ConversationState::from_history(history);
    assert_eq!(state.phase(), Phase::AwaitingModelResponse);

    let model = Arc::new(ScriptedModel::new());
    let phase = controller(&model, jira_set()).step(&mut state).await.unwrap();

    assert_eq!(phase, Phase::Terminated(TerminationReason::CompletionSignature));
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn tool_requests_get_one_result_each_in_order() {
    let model = Arc::new(ScriptedModel::new());
    model.queue_tool_calls(vec![
        ToolCall::new("c1", "update_issue", json!({ "content": "Login returns 500" })),
        ToolCall::new("c2", "update_issue", json!({ "content": "Login returns 500 on Safari" })),
    ]);
    let ctrl = controller(&model, jira_set());

    let mut state = ConversationState::new();
    state.push_user("track the login bug").unwrap();
    assert_eq!(ctrl.step(&mut state).await.unwrap(), Phase::Dispatching);
    assert_eq!(ctrl.step(&mut state).await.unwrap(), Phase::AwaitingModelResponse);

    let results: Vec<(String, bool)> = state
        .history()
        .messages()
        .filter_map(|m| match m {
            Message::ToolResult(r) => Some((r.call_id.clone(), r.success)),
            _ => None,
        })
        .collect();
    assert_eq!(results, vec![("c1".to_string(), true), ("c2".to_string(), true)]);
    assert!(state.history().pending_tool_calls().is_empty());
    assert_eq!(state.draft(), &IssueDraft::new("Login returns 500 on Safari"));
}

#[tokio::test]
async fn ticket_creation_ends_the_run() {
    let model = Arc::new(ScriptedModel::new());
    model.queue_tool_calls(vec![ToolCall::new(
        "c1",
        "create_jira_ticket",
        json!({ "project_key": "ops", "summary": "Login returns 500" }),
    )]);

    let mut state = ConversationState::new();
    state.push_user("create it").unwrap();
    let outcome = controller(&model, jira_set()).run(state).await;

    assert!(outcome.is_success(), "{:?}", outcome.error);
    assert_eq!(outcome.reason(), Some(TerminationReason::CompletionSignature));
    assert_eq!(outcome.iterations, 1);
    assert_eq!(
        outcome.state.history().last_tool_result().map(|r| r.content.as_str()),
        Some("Issue created: https://acme.atlassian.net/browse/OPS-42")
    );
}

#[tokio::test]
async fn model_failure_terminates_and_keeps_history() {
    let model = Arc::new(ScriptedModel::new());
    model.queue_error(AgentError::api(500, "upstream down"));
    let ctrl = controller(&model, jira_set());

    let mut state = ConversationState::new();
    state.push_user("hello").unwrap();
    let err = ctrl.step(&mut state).await.unwrap_err();

    assert!(matches!(err, AgentError::Api { status: 500, .. }));
    assert_eq!(state.phase(), Phase::Terminated(TerminationReason::Failed));
    assert_eq!(state.history().len(), 1);
}

#[tokio::test]
async fn exhausted_retries_are_recorded_then_surfaced() {
    let attempts = Arc::new(AtomicU32::new(0));
    let tools = ToolSet::default()
        .with(failing_tool(attempts.clone()))
        .with(update_issue_tool());
    let model = Arc::new(ScriptedModel::new());
    model.queue_tool_calls(vec![
        ToolCall::new("c1", "flaky", json!({})),
        ToolCall::new("c2", "update_issue", json!({ "content": "never applied" })),
    ]);
    let ctrl = ConversationController::new(model.clone(), tools).with_executor(fast_executor(2));

    let mut state = ConversationState::new();
    state.push_user("go").unwrap();
    let outcome = ctrl.run(state).await;

    match outcome.error {
        Some(AgentError::Tool(ToolError::RetriesExhausted { attempts: n, ref last, .. })) => {
            assert_eq!(n, 2);
            assert!(matches!(last.as_deref(), Some(ToolError::RemoteFailure { status: Some(503), .. })));
        }
        other => panic!("expected exhausted retries, got {other:?}"),
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(outcome.reason(), Some(TerminationReason::Failed));

    let history = outcome.state.history();
    assert!(history.pending_tool_calls().is_empty());
    let failed: Vec<bool> = history
        .messages()
        .filter_map(|m| match m {
            Message::ToolResult(r) => Some(r.success),
            _ => None,
        })
        .collect();
    assert_eq!(failed, vec![false, false]);
    assert!(outcome.state.draft().is_empty());
}

#[tokio::test]
async fn unknown_tool_and_bad_arguments_are_reported_to_the_model() {
    let model = Arc::new(ScriptedModel::new());
    model.queue_tool_calls(vec![
        ToolCall::new("c1", "delete_everything", json!({})),
        ToolCall::new("c2", "update_issue", json!({ "text": "wrong field" })),
    ]);
    model.queue_text("Sorry, let me try again.");
    let ctrl = controller(&model, jira_set());

    let mut state = ConversationState::new();
    state.push_user("go").unwrap();
    let outcome = ctrl.run(state).await;

    assert_eq!(outcome.reason(), Some(TerminationReason::FinalAnswer));
    let results: Vec<String> = outcome
        .state
        .history()
        .messages()
        .filter_map(|m| match m {
            Message::ToolResult(r) if !r.success => Some(r.content.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(results[0], "Tool 'delete_everything' not found");
    assert!(results[1].contains("missing required field 'content'"));
    assert_eq!(model.call_count(), 2);
}

#[tokio::test]
async fn await_user_policy_reads_input_until_closed() {
    let model = Arc::new(ScriptedModel::new());
    model.queue_text("How can I help?");
    model.queue_text("Noted.");
    let ctrl = controller(&model, jira_set())
        .with_final_answer_policy(FinalAnswerPolicy::AwaitUser)
        .with_input(QueuedInput::new(["hi", "bug in login"]));

    let outcome = ctrl.run(ConversationState::new()).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.reason(), Some(TerminationReason::InputClosed));
    assert_eq!(outcome.iterations, 2);
    let texts: Vec<&str> = outcome.state.history().messages().filter_map(Message::text).collect();
    assert_eq!(texts, vec!["hi", "How can I help?", "bug in login", "Noted."]);
}

#[tokio::test]
async fn no_input_source_closes_immediately() {
    let model = Arc::new(ScriptedModel::new());
    let outcome = controller(&model, jira_set()).run(ConversationState::new()).await;
    assert_eq!(outcome.reason(), Some(TerminationReason::InputClosed));
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn iteration_limit_stops_runaway_loops() {
    let model = Arc::new(ScriptedModel::new());
    for i in 0..5 {
        model.queue_tool_calls(vec![ToolCall::new(format!("c{i}"), "update_issue", json!({ "content": "x" }))]);
    }
    let ctrl = controller(&model, jira_set()).with_max_iterations(2);

    let mut state = ConversationState::new();
    state.push_user("loop").unwrap();
    let outcome = ctrl.run(state).await;

    assert!(matches!(outcome.error, Some(AgentError::IterationLimit(2))));
    assert_eq!(model.call_count(), 2);
    assert_eq!(outcome.reason(), Some(TerminationReason::Failed));
}

#[tokio::test]
async fn request_carries_system_prompt_and_tool_schemas() {
    let model = Arc::new(ScriptedModel::new());
    model.queue_text("done");
    let ctrl = controller(&model, jira_set()).with_system_prompt("You are a Jira assistant.");

    let mut state = ConversationState::new();
    state.push_user("hi").unwrap();
    ctrl.run(state).await;

    let request = &model.requests()[0];
    assert_eq!(request.messages[0], Message::system("You are a Jira assistant."));
    assert_eq!(request.messages[1], Message::user("hi"));
    let names: Vec<&str> = request.tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["update_issue", "create_jira_ticket"]);
}

#[tokio::test]
async fn restricted_signature_ignores_other_tools() {
    let model = Arc::new(ScriptedModel::new());
    model.queue_tool_calls(vec![ToolCall::new(
        "c1",
        "update_issue",
        json!({ "content": "Please create this issue" }),
    )]);
    model.queue_text("Shall I create it?");
    let ctrl = controller(&model, jira_set())
        .with_predicate(CompletionSignature::default().for_tools(["create_jira_ticket"]));

    let mut state = ConversationState::new();
    state.push_user("draft it").unwrap();
    let outcome = ctrl.run(state).await;

    assert_eq!(outcome.reason(), Some(TerminationReason::FinalAnswer));
    assert_eq!(model.call_count(), 2);
}

#[tokio::test]
async fn restricted_signature_sees_ticket_created_before_a_later_update() {
    let model = Arc::new(ScriptedModel::new());
    model.queue_tool_calls(vec![
        ToolCall::new(
            "c1",
            "create_jira_ticket",
            json!({ "project_key": "OPS", "summary": "Login returns 500" }),
        ),
        ToolCall::new("c2", "update_issue", json!({ "content": "Login returns 500" })),
    ]);
    model.queue_text("Anything else?");
    let ctrl = controller(&model, jira_set())
        .with_predicate(CompletionSignature::default().for_tools(["create_jira_ticket"]));

    let mut state = ConversationState::new();
    state.push_user("file it and note it").unwrap();
    let outcome = ctrl.run(state).await;

    assert_eq!(outcome.reason(), Some(TerminationReason::CompletionSignature));
    assert_eq!(model.call_count(), 1);
}

#[tokio::test]
async fn completion_wins_over_iteration_limit() {
    let model = Arc::new(ScriptedModel::new());
    model.queue_tool_calls(vec![ToolCall::new(
        "c1",
        "create_jira_ticket",
        json!({ "project_key": "OPS", "summary": "Login returns 500" }),
    )]);
    let ctrl = controller(&model, jira_set()).with_max_iterations(1);

    let mut state = ConversationState::new();
    state.push_user("create it").unwrap();
    let outcome = ctrl.run(state).await;

    assert!(outcome.is_success(), "{:?}", outcome.error);
    assert_eq!(outcome.reason(), Some(TerminationReason::CompletionSignature));
    assert_eq!(outcome.iterations, 1);
}

#[tokio::test]
async fn events_follow_the_conversation() {
    let model = Arc::new(ScriptedModel::new());
    model.queue_tool_calls(vec![ToolCall::new("c1", "update_issue", json!({ "content": "x" }))]);
    model.queue_text("Updated.");
    let log = EventLog::default();
    let ctrl = controller(&model, jira_set()).with_event_sink(log.sink());

    let mut state = ConversationState::new();
    state.push_user("update").unwrap();
    ctrl.run(state).await;

    let kinds: Vec<&str> = log
        .events()
        .iter()
        .map(|e| match e {
            LoopEvent::ToolCallStarted { .. } => "started",
            LoopEvent::ToolResult { .. } => "result",
            LoopEvent::AssistantText { .. } => "text",
            LoopEvent::PhaseChanged { .. } => "phase",
            LoopEvent::Terminated { .. } => "terminated",
            _ => "other",
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["phase", "started", "result", "phase", "text", "phase", "terminated"]
    );
}
