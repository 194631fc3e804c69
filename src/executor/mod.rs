//! Tool executor: validate arguments, run the operation on a deadline-bounded
//! worker, retry retryable failures within a budget, and normalize the result.

use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::{DEFAULT_RETRY_BUDGET, DEFAULT_TOOL_TIMEOUT};
use crate::error::ToolError;
use crate::tools::{Tool, ToolArguments, ToolContext};
use crate::types::IssueDraft;
use crate::util::retry::Backoff;
use crate::util::timeout::{run_detached, WorkerFailure};

/// Time cap, retry budget and backoff for one tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPolicy {
    /// Wall-clock limit per attempt.
    pub timeout: Duration,
    /// Maximum number of attempts; each failed attempt consumes one unit.
    pub retry_budget: u32,
    pub backoff: Backoff,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TOOL_TIMEOUT,
            retry_budget: DEFAULT_RETRY_BUDGET,
            backoff: Backoff::default(),
        }
    }
}

impl ExecutionPolicy {
    pub fn new(timeout: Duration, retry_budget: u32) -> Self {
        Self {
            timeout,
            retry_budget,
            ..Self::default()
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Normalized successful tool outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub content: serde_json::Value,
    /// Progress entries reported by the successful attempt, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partials: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<IssueDraft>,
    /// Attempts used, including the successful one.
    pub attempts: u32,
}

impl ToolOutput {
    /// Content as message text: strings verbatim, other JSON compact.
    pub fn text(&self) -> String {
        match &self.content {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// Observable steps of one execution, as produced by [`ToolExecutor::stream`].
#[derive(Debug)]
pub enum ExecutionEvent {
    Started { tool: String, attempt: u32 },
    Progress { tool: String, attempt: u32, entry: serde_json::Value },
    Retrying { tool: String, attempt: u32, delay: Duration, error: String },
    Finished(Result<ToolOutput, ToolError>),
}

/// Runs tools under an [`ExecutionPolicy`].
#[derive(Debug, Clone, Default)]
pub struct ToolExecutor {
    policy: ExecutionPolicy,
}

impl ToolExecutor {
    pub fn new(policy: ExecutionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ExecutionPolicy {
        &self.policy
    }

    /// Effective policy for a tool: its own override, else the executor default.
    pub fn policy_for(&self, tool: &dyn Tool) -> ExecutionPolicy {
        tool.policy().cloned().unwrap_or_else(|| self.policy.clone())
    }

    /// Execute `tool` with its effective policy.
    pub async fn run(
        &self,
        tool: &Arc<dyn Tool>,
        raw_arguments: &serde_json::Value,
        ctx: ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let policy = self.policy_for(tool.as_ref());
        execute_with(tool, raw_arguments, ctx, &policy, None).await
    }

    /// Execute `tool`, yielding attempt, progress and retry events, then the
    /// final result as [`ExecutionEvent::Finished`].
    pub fn stream(
        &self,
        tool: Arc<dyn Tool>,
        raw_arguments: serde_json::Value,
        ctx: ToolContext,
    ) -> impl Stream<Item = ExecutionEvent> + Send {
        let policy = self.policy_for(tool.as_ref());
        async_stream::stream! {
            let (tx, mut rx) = mpsc::unbounded_channel();
            let run = execute_with(&tool, &raw_arguments, ctx, &policy, Some(tx));
            tokio::pin!(run);

            let result = loop {
                let step = tokio::select! {
                    biased;
                    Some(event) = rx.recv() => Ok(event),
                    result = &mut run => Err(result),
                };
                match step {
                    Ok(event) => {
                        yield event;
                    }
                    Err(result) => break result,
                }
            };
            while let Ok(event) = rx.try_recv() {
                yield event;
            }
            yield ExecutionEvent::Finished(result);
        }
    }
}

/// Execute `tool` once per the given timeout and retry budget, with the
/// default backoff schedule.
///
/// Invalid arguments fail immediately without running the operation. A budget
/// of `n` allows at most `n` attempts.
pub async fn execute(
    tool: &Arc<dyn Tool>,
    raw_arguments: &serde_json::Value,
    ctx: ToolContext,
    timeout: Duration,
    retry_budget: u32,
) -> Result<ToolOutput, ToolError> {
    let policy = ExecutionPolicy::new(timeout, retry_budget);
    execute_with(tool, raw_arguments, ctx, &policy, None).await
}

/// Execute `tool` under a full policy.
pub async fn execute_with(
    tool: &Arc<dyn Tool>,
    raw_arguments: &serde_json::Value,
    ctx: ToolContext,
    policy: &ExecutionPolicy,
    events: Option<mpsc::UnboundedSender<ExecutionEvent>>,
) -> Result<ToolOutput, ToolError> {
    let name = tool.name().to_string();
    let emit = |event: ExecutionEvent| {
        if let Some(tx) = &events {
            let _ = tx.send(event);
        }
    };

    let validated = tool.parameters().validate(raw_arguments).map_err(|message| {
        warn!(tool = %name, error = %message, "tool arguments rejected");
        ToolError::invalid_arguments(&name, message)
    })?;
    let args = ToolArguments::new(&name, validated);

    let mut remaining = policy.retry_budget;
    let mut attempts = 0u32;
    let mut last_error: Option<ToolError> = None;

    while remaining > 0 {
        attempts += 1;
        emit(ExecutionEvent::Started {
            tool: name.clone(),
            attempt: attempts,
        });
        debug!(tool = %name, attempt = attempts, timeout_ms = policy.timeout.as_millis() as u64, "tool attempt");

        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let attempt_ctx = ctx.clone().with_progress(progress_tx);
        let worker_tool = Arc::clone(tool);
        let worker_args = args.clone();
        let worker = run_detached(policy.timeout, async move {
            worker_tool.execute(&worker_args, &attempt_ctx).await
        });
        tokio::pin!(worker);

        let mut partials = Vec::new();
        let outcome = loop {
            tokio::select! {
                biased;
                Some(entry) = progress_rx.recv() => {
                    emit(ExecutionEvent::Progress {
                        tool: name.clone(),
                        attempt: attempts,
                        entry: entry.clone(),
                    });
                    partials.push(entry);
                }
                outcome = &mut worker => break outcome,
            }
        };

        let error = match outcome {
            Ok(Ok(response)) => {
                while let Ok(entry) = progress_rx.try_recv() {
                    emit(ExecutionEvent::Progress {
                        tool: name.clone(),
                        attempt: attempts,
                        entry: entry.clone(),
                    });
                    partials.push(entry);
                }
                info!(tool = %name, attempts, "tool succeeded");
                return Ok(ToolOutput {
                    content: response.content,
                    partials,
                    draft: response.draft,
                    attempts,
                });
            }
            Ok(Err(err)) if !err.is_retryable() => {
                warn!(tool = %name, attempt = attempts, error = %err, "tool failed without retry");
                return Err(err);
            }
            Ok(Err(err)) => err,
            Err(WorkerFailure::DeadlineElapsed) => ToolError::Timeout {
                tool: name.clone(),
                timeout_ms: policy.timeout.as_millis() as u64,
            },
            Err(WorkerFailure::Crashed(message)) => {
                ToolError::remote(&name, format!("worker crashed: {message}"))
            }
        };

        remaining -= 1;
        if remaining > 0 {
            let delay = policy.backoff.delay(attempts - 1);
            warn!(
                tool = %name,
                attempt = attempts,
                retries_left = remaining,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying after error"
            );
            emit(ExecutionEvent::Retrying {
                tool: name.clone(),
                attempt: attempts,
                delay,
                error: error.to_string(),
            });
            tokio::time::sleep(delay).await;
        }
        last_error = Some(error);
    }

    error!(tool = %name, attempts, "retry budget exhausted");
    Err(ToolError::RetriesExhausted {
        tool: name,
        attempts,
        last: last_error.map(Box::new),
    })
}
