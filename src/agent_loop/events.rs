//! Loop event stream types.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{ToolCall, ToolResult};

use super::types::{Phase, TerminationReason};

/// Observable steps of a conversation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoopEvent {
    UserMessage {
        text: String,
    },
    AssistantText {
        text: String,
    },
    ToolCallStarted {
        call: ToolCall,
    },
    ToolProgress {
        call_id: String,
        tool: String,
        attempt: u32,
        entry: serde_json::Value,
    },
    ToolRetrying {
        call_id: String,
        tool: String,
        attempt: u32,
        delay_ms: u64,
        error: String,
    },
    ToolResult {
        tool: String,
        result: ToolResult,
    },
    PhaseChanged {
        from: Phase,
        to: Phase,
    },
    Terminated {
        reason: TerminationReason,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// Envelope delivered to a [`LoopEventSink`].
#[derive(Debug, Clone, Serialize)]
pub struct LoopEventEnvelope {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub event: LoopEvent,
}

/// Callback used for streaming loop events.
pub type LoopEventSink = Arc<dyn Fn(LoopEventEnvelope) + Send + Sync>;

pub(crate) struct LoopEventEmitter {
    seq: AtomicU64,
    sink: Option<LoopEventSink>,
}

impl LoopEventEmitter {
    pub(crate) fn new(sink: Option<LoopEventSink>) -> Self {
        Self {
            seq: AtomicU64::new(1),
            sink,
        }
    }

    pub(crate) fn emit(&self, event: LoopEvent) {
        let Some(sink) = &self.sink else {
            return;
        };
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        (sink)(LoopEventEnvelope {
            seq,
            timestamp: Utc::now(),
            event,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn emitter_numbers_events_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let emitter = LoopEventEmitter::new(Some(Arc::new(move |envelope: LoopEventEnvelope| {
            sink_seen.lock().unwrap().push(envelope.seq);
        })));
        emitter.emit(LoopEvent::UserMessage { text: "a".into() });
        emitter.emit(LoopEvent::AssistantText { text: "b".into() });
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let value = serde_json::to_value(LoopEvent::Terminated {
            reason: TerminationReason::FinalAnswer,
            error: None,
        })
        .unwrap();
        assert_eq!(value, serde_json::json!({ "type": "terminated", "reason": "final_answer" }));
    }
}
