//! Shared test helpers: scripted model and recording event sink.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use ticket_agent::agent_loop::{LoopEvent, LoopEventEnvelope, LoopEventSink};
use ticket_agent::error::{AgentError, Result};
use ticket_agent::provider::{ChatModel, ModelRequest, ModelResponse};
use ticket_agent::types::ToolCall;

/// A model that returns queued responses and records every request.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<ModelResponse>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a text-only response.
    pub fn queue_text(&self, text: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(ModelResponse::text(text)));
    }

    /// Queue a response requesting the given tool calls.
    pub fn queue_tool_calls(&self, calls: Vec<ToolCall>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(ModelResponse::tool_calls(calls)));
    }

    /// Queue a failing call.
    pub fn queue_error(&self, err: AgentError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn model_id(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AgentError::InvalidState("no scripted response left".into())))
    }
}

/// Collects loop events for later assertions.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<LoopEvent>>>,
}

impl EventLog {
    pub fn sink(&self) -> LoopEventSink {
        let events = Arc::clone(&self.events);
        Arc::new(move |envelope: LoopEventEnvelope| {
            events.lock().unwrap().push(envelope.event);
        })
    }

    pub fn events(&self) -> Vec<LoopEvent> {
        self.events.lock().unwrap().clone()
    }
}
