//! Conversation messages and the append-only history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Outcome of one tool call, as shown to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub call_id: String,
    pub content: String,
    #[serde(default = "default_success")]
    pub success: bool,
}

fn default_success() -> bool {
    true
}

/// A single entry of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Instructions sent ahead of the history on every model request.
    System { text: String },
    UserText { text: String },
    AssistantText { text: String },
    AssistantToolRequest(ToolCall),
    ToolResult(ToolResult),
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self::System { text: text.into() }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::UserText { text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::AssistantText { text: text.into() }
    }

    pub fn tool_request(call: ToolCall) -> Self {
        Self::AssistantToolRequest(call)
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>, success: bool) -> Self {
        Self::ToolResult(ToolResult {
            call_id: call_id.into(),
            content: content.into(),
            success,
        })
    }

    /// Text content, if this message carries any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::System { text } | Self::UserText { text } | Self::AssistantText { text } => {
                Some(text)
            }
            Self::ToolResult(result) => Some(&result.content),
            Self::AssistantToolRequest(_) => None,
        }
    }
}

/// A history entry together with the moment it was appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub message: Message,
    pub timestamp: DateTime<Utc>,
}

/// Ordered, append-only record of one conversation.
///
/// There is deliberately no API to remove or reorder entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConversationHistory {
    entries: Vec<HistoryEntry>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.entries.push(HistoryEntry {
            message,
            timestamp: Utc::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn messages(&self) -> impl DoubleEndedIterator<Item = &Message> + ExactSizeIterator {
        self.entries.iter().map(|entry| &entry.message)
    }

    pub fn last(&self) -> Option<&Message> {
        self.entries.last().map(|entry| &entry.message)
    }

    /// Most recent tool result, regardless of what follows it.
    pub fn last_tool_result(&self) -> Option<&ToolResult> {
        self.messages().rev().find_map(|message| match message {
            Message::ToolResult(result) => Some(result),
            _ => None,
        })
    }

    pub fn tool_results(&self) -> impl DoubleEndedIterator<Item = &ToolResult> {
        self.messages().filter_map(|message| match message {
            Message::ToolResult(result) => Some(result),
            _ => None,
        })
    }

    /// Tool calls that have no matching result yet, in request order.
    pub fn pending_tool_calls(&self) -> Vec<&ToolCall> {
        let mut pending: Vec<&ToolCall> = Vec::new();
        for message in self.messages() {
            match message {
                Message::AssistantToolRequest(call) => pending.push(call),
                Message::ToolResult(result) => pending.retain(|call| call.id != result.call_id),
                _ => {}
            }
        }
        pending
    }

    /// Find the tool call a result answers.
    pub fn call_for_result(&self, result: &ToolResult) -> Option<&ToolCall> {
        self.messages().find_map(|message| match message {
            Message::AssistantToolRequest(call) if call.id == result.call_id => Some(call),
            _ => None,
        })
    }
}

impl FromIterator<Message> for ConversationHistory {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        let mut history = Self::new();
        for message in iter {
            history.push(message);
        }
        history
    }
}
