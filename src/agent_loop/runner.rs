//! Conversation loop controller.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_MAX_ITERATIONS;
use crate::error::{AgentError, Result, ToolError};
use crate::executor::{ExecutionEvent, ToolExecutor, ToolOutput};
use crate::provider::{ChatModel, ModelRequest};
use crate::stop::{CompletionSignature, TerminationPredicate};
use crate::tools::{ToolContext, ToolSet};
use crate::types::{Message, ModelSettings, ToolCall, ToolResult};

use super::events::{LoopEvent, LoopEventEmitter, LoopEventSink};
use super::input::InputSource;
use super::types::{ConversationState, FinalAnswerPolicy, Phase, RunOutcome, TerminationReason};

/// Drives a conversation between a user, a chat model and a set of tools.
///
/// Each [`step`](Self::step) performs one transition: read one input line,
/// make one model call, or dispatch every tool request of the current turn.
pub struct ConversationController {
    model: Arc<dyn ChatModel>,
    tools: ToolSet,
    executor: ToolExecutor,
    system_prompt: Option<String>,
    settings: ModelSettings,
    predicate: Arc<dyn TerminationPredicate>,
    final_answer: FinalAnswerPolicy,
    max_iterations: usize,
    input: Option<Arc<dyn InputSource>>,
    emitter: LoopEventEmitter,
}

impl ConversationController {
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolSet) -> Self {
        Self {
            model,
            tools,
            executor: ToolExecutor::default(),
            system_prompt: None,
            settings: ModelSettings::default(),
            predicate: Arc::new(CompletionSignature::default()),
            final_answer: FinalAnswerPolicy::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            input: None,
            emitter: LoopEventEmitter::new(None),
        }
    }

    pub fn with_executor(mut self, executor: ToolExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_settings(mut self, settings: ModelSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_predicate(mut self, predicate: impl TerminationPredicate + 'static) -> Self {
        self.predicate = Arc::new(predicate);
        self
    }

    pub fn with_final_answer_policy(mut self, policy: FinalAnswerPolicy) -> Self {
        self.final_answer = policy;
        self
    }

    /// Upper bound on model calls per [`run`](Self::run).
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_input(mut self, input: impl InputSource + 'static) -> Self {
        self.input = Some(Arc::new(input));
        self
    }

    pub fn with_event_sink(mut self, sink: LoopEventSink) -> Self {
        self.emitter = LoopEventEmitter::new(Some(sink));
        self
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    /// Perform one transition and return the new phase.
    ///
    /// A terminated state is returned unchanged. Model and input failures, and
    /// tool calls that exhaust their retry budget, terminate the conversation
    /// with [`TerminationReason::Failed`] and are returned as errors; the
    /// history stays in `state`.
    pub async fn step(&self, state: &mut ConversationState) -> Result<Phase> {
        match state.phase() {
            Phase::Terminated(_) => Ok(state.phase()),
            Phase::AwaitingUserInput => self.read_input(state).await,
            Phase::AwaitingModelResponse => self.call_model(state).await,
            Phase::Dispatching => self.dispatch(state).await,
        }
    }

    /// Step until the conversation terminates or the model-call limit is hit.
    ///
    /// Only turns that will reach the model count toward the limit.
    pub async fn run(&self, mut state: ConversationState) -> RunOutcome {
        let mut iterations = 0usize;
        while !state.is_terminated() {
            let model_turn = state.phase() == Phase::AwaitingModelResponse
                && !self.predicate.is_complete(state.history());
            if model_turn {
                if iterations >= self.max_iterations {
                    warn!(max_iterations = self.max_iterations, "conversation exceeded max iterations");
                    let err = AgentError::IterationLimit(self.max_iterations);
                    self.terminate(&mut state, TerminationReason::Failed, Some(&err));
                    return RunOutcome::new(state, iterations, Some(err));
                }
                iterations += 1;
            }
            if let Err(err) = self.step(&mut state).await {
                return RunOutcome::new(state, iterations, Some(err));
            }
        }
        info!(iterations, phase = %state.phase(), "conversation finished");
        RunOutcome::new(state, iterations, None)
    }

    async fn read_input(&self, state: &mut ConversationState) -> Result<Phase> {
        let Some(input) = &self.input else {
            return Ok(self.terminate(state, TerminationReason::InputClosed, None));
        };
        match input.next_line().await {
            Ok(Some(line)) => {
                state.push_user(line.clone())?;
                self.emitter.emit(LoopEvent::UserMessage { text: line });
                self.emit_phase(Phase::AwaitingUserInput, state.phase());
                Ok(state.phase())
            }
            Ok(None) => Ok(self.terminate(state, TerminationReason::InputClosed, None)),
            Err(err) => {
                self.terminate(state, TerminationReason::Failed, Some(&err));
                Err(err)
            }
        }
    }

    async fn call_model(&self, state: &mut ConversationState) -> Result<Phase> {
        if self.predicate.is_complete(state.history()) {
            return Ok(self.terminate(state, TerminationReason::CompletionSignature, None));
        }

        let request = self.build_request(state);
        debug!(model = self.model.model_id(), messages = request.messages.len(), "model call");
        let response = match self.model.complete(&request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "model call failed");
                self.terminate(state, TerminationReason::Failed, Some(&err));
                return Err(err);
            }
        };

        if !response.text.is_empty() {
            state.append(Message::assistant(response.text.clone()));
            self.emitter.emit(LoopEvent::AssistantText { text: response.text });
        }

        let next = if !response.tool_calls.is_empty() {
            for call in response.tool_calls {
                state.append(Message::tool_request(call));
            }
            Phase::Dispatching
        } else {
            match self.final_answer {
                FinalAnswerPolicy::Terminate => {
                    return Ok(self.terminate(state, TerminationReason::FinalAnswer, None));
                }
                FinalAnswerPolicy::AwaitUser => Phase::AwaitingUserInput,
            }
        };
        self.set_phase(state, next);
        Ok(next)
    }

    fn build_request(&self, state: &ConversationState) -> ModelRequest {
        let mut messages = Vec::with_capacity(state.history().len() + 1);
        if let Some(prompt) = &self.system_prompt {
            messages.push(Message::system(prompt.clone()));
        }
        messages.extend(state.history().messages().cloned());
        ModelRequest {
            messages,
            tools: self.tools.definitions(),
            settings: self.settings.clone(),
        }
    }

    async fn dispatch(&self, state: &mut ConversationState) -> Result<Phase> {
        let pending: Vec<ToolCall> = state
            .history()
            .pending_tool_calls()
            .into_iter()
            .cloned()
            .collect();

        let mut fatal: Option<(String, ToolError)> = None;
        for call in pending {
            if let Some((failed_tool, _)) = &fatal {
                let result = ToolResult {
                    call_id: call.id.clone(),
                    content: format!("Skipped: tool '{failed_tool}' failed earlier in this turn"),
                    success: false,
                };
                self.record_result(state, &call, result);
                continue;
            }

            self.emitter.emit(LoopEvent::ToolCallStarted { call: call.clone() });
            let result = match self.execute_call(state, &call).await {
                Ok(output) => {
                    if let Some(draft) = output.draft.clone() {
                        state.set_draft(draft);
                    }
                    ToolResult {
                        call_id: call.id.clone(),
                        content: output.text(),
                        success: true,
                    }
                }
                Err(err) => {
                    let result = ToolResult {
                        call_id: call.id.clone(),
                        content: err.to_string(),
                        success: false,
                    };
                    if matches!(err, ToolError::RetriesExhausted { .. }) {
                        fatal = Some((call.name.clone(), err));
                    }
                    result
                }
            };
            self.record_result(state, &call, result);
        }

        if let Some((_, err)) = fatal {
            let err = AgentError::Tool(err);
            self.terminate(state, TerminationReason::Failed, Some(&err));
            return Err(err);
        }
        self.set_phase(state, Phase::AwaitingModelResponse);
        Ok(Phase::AwaitingModelResponse)
    }

    async fn execute_call(
        &self,
        state: &ConversationState,
        call: &ToolCall,
    ) -> std::result::Result<ToolOutput, ToolError> {
        let Some(tool) = self.tools.get(&call.name) else {
            warn!(tool = %call.name, call_id = %call.id, "unknown tool requested");
            return Err(ToolError::NotFound(call.name.clone()));
        };

        let ctx = ToolContext::new(state.draft().clone()).with_call_id(call.id.clone());
        let events = self
            .executor
            .stream(Arc::clone(tool), call.arguments.clone(), ctx);
        futures::pin_mut!(events);

        let mut finished = None;
        while let Some(event) = events.next().await {
            match event {
                ExecutionEvent::Started { attempt, .. } => {
                    debug!(tool = %call.name, call_id = %call.id, attempt, "tool attempt started");
                }
                ExecutionEvent::Progress { attempt, entry, .. } => {
                    self.emitter.emit(LoopEvent::ToolProgress {
                        call_id: call.id.clone(),
                        tool: call.name.clone(),
                        attempt,
                        entry,
                    });
                }
                ExecutionEvent::Retrying {
                    attempt,
                    delay,
                    error,
                    ..
                } => {
                    self.emitter.emit(LoopEvent::ToolRetrying {
                        call_id: call.id.clone(),
                        tool: call.name.clone(),
                        attempt,
                        delay_ms: delay.as_millis() as u64,
                        error,
                    });
                }
                ExecutionEvent::Finished(result) => finished = Some(result),
            }
        }
        finished.unwrap_or_else(|| Err(ToolError::remote(&call.name, "execution ended without a result")))
    }

    fn record_result(&self, state: &mut ConversationState, call: &ToolCall, result: ToolResult) {
        debug!(tool = %call.name, call_id = %call.id, success = result.success, "tool result appended");
        state.append(Message::ToolResult(result.clone()));
        self.emitter.emit(LoopEvent::ToolResult {
            tool: call.name.clone(),
            result,
        });
    }

    fn set_phase(&self, state: &mut ConversationState, to: Phase) {
        let from = state.phase();
        state.set_phase(to);
        self.emit_phase(from, to);
    }

    fn emit_phase(&self, from: Phase, to: Phase) {
        if from != to {
            debug!(%from, %to, "phase change");
            self.emitter.emit(LoopEvent::PhaseChanged { from, to });
        }
    }

    fn terminate(
        &self,
        state: &mut ConversationState,
        reason: TerminationReason,
        error: Option<&AgentError>,
    ) -> Phase {
        let phase = Phase::Terminated(reason);
        self.set_phase(state, phase);
        info!(%reason, "conversation terminated");
        self.emitter.emit(LoopEvent::Terminated {
            reason,
            error: error.map(ToString::to_string),
        });
        phase
    }
}

impl std::fmt::Debug for ConversationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationController")
            .field("model", &self.model.model_id())
            .field("tools", &self.tools)
            .field("executor", &self.executor)
            .field("final_answer", &self.final_answer)
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}
