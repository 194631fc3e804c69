//! CLI definitions and console rendering for the `ticket-agent` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::agent_loop::{ConversationState, LoopEvent, LoopEventEnvelope};
use crate::executor::ExecutionEvent;
use crate::tools::builtin::DEFAULT_DATA_URL;

/// First user turn of a `jira` session, so the model greets before stdin is read.
pub const JIRA_OPENING_TURN: &str = "How can I help you?";

/// Fresh `jira` session state with the opening turn queued for the model.
pub fn jira_opening_state() -> ConversationState {
    let mut state = ConversationState::new();
    // A new state is never terminated.
    let _ = state.push_user(JIRA_OPENING_TURN);
    state
}

/// Tool-calling assistant for Jira tickets and REST data.
#[derive(Parser, Debug)]
#[command(name = "ticket-agent", version, about = "Tool-calling assistant for Jira tickets and REST data")]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive Jira assistant
    Jira(JiraArgs),
    /// Fetch data from a REST endpoint through the tool executor
    Fetch(FetchArgs),
}

/// Arguments for the `jira` subcommand.
#[derive(Parser, Debug)]
pub struct JiraArgs {
    /// Model to use (overrides config)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Temperature (0.0 - 2.0)
    #[arg(short, long)]
    pub temperature: Option<f64>,
}

/// Arguments for the `fetch` subcommand.
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Query string sent as `q`
    #[arg(short, long)]
    pub query: String,

    /// API endpoint
    #[arg(long, default_value = DEFAULT_DATA_URL)]
    pub api_url: String,

    /// Retry budget (overrides config)
    #[arg(long)]
    pub retries: Option<u32>,

    /// Per-attempt timeout in seconds (overrides config)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Print progress events while running
    #[arg(long)]
    pub stream: bool,
}

const PREVIEW_LIMIT: usize = 200;

/// Shorten `text` to at most `limit` bytes on a char boundary.
pub fn truncate(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// Render a loop event for the terminal, if it is worth showing.
pub fn render_loop_event(envelope: &LoopEventEnvelope) -> Option<String> {
    match &envelope.event {
        LoopEvent::AssistantText { text } => Some(format!("\nAI: {text}")),
        LoopEvent::ToolCallStarted { call } => Some(format!("USING TOOL: {} ({})", call.name, call.id)),
        LoopEvent::ToolRetrying {
            tool, attempt, error, ..
        } => Some(format!("  retrying {tool} after attempt {attempt}: {error}")),
        LoopEvent::ToolResult { result, .. } => {
            let marker = if result.success { "TOOL RESULT" } else { "TOOL ERROR" };
            Some(format!("\n{marker}: {}", truncate(&result.content, PREVIEW_LIMIT)))
        }
        LoopEvent::Terminated {
            error: Some(error), ..
        } => Some(format!("\nError: {error}")),
        _ => None,
    }
}

/// Render an executor event for `fetch --stream`.
pub fn render_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::Started { tool, attempt } => format!("{tool}: attempt {attempt}"),
        ExecutionEvent::Progress { entry, .. } => format!("  {entry}"),
        ExecutionEvent::Retrying { delay, error, .. } => {
            format!("  retrying in {}ms: {error}", delay.as_millis())
        }
        ExecutionEvent::Finished(Ok(output)) => output.text(),
        ExecutionEvent::Finished(Err(err)) => format!("Error: {err}"),
    }
}
