//! Chat model trait and the OpenAI-compatible implementation.

pub mod http;
pub mod openai;

use async_trait::async_trait;

use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::types::{Message, ModelSettings, ToolCall};

pub use openai::OpenAiChatModel;

/// A request sent to a chat model.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    /// System prompt followed by the conversation, in order.
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub settings: ModelSettings,
}

/// Tool definition sent to the provider API.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Response from a chat model: text and/or tool requests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

impl ModelResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            text: String::new(),
            tool_calls: calls,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Opaque model call: ordered messages and tool schemas in, text and tool
/// requests out.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// The model ID this instance serves.
    fn model_id(&self) -> &str;

    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse>;
}

/// Create the configured chat model.
pub fn create_chat_model(config: &AgentConfig) -> Result<Box<dyn ChatModel>> {
    let api_key = config
        .openai_api_key
        .clone()
        .ok_or_else(|| AgentError::Authentication("Missing OPENAI_API_KEY".into()))?;
    Ok(Box::new(OpenAiChatModel::new(
        config.model.clone(),
        api_key,
        config.openai_base_url.clone(),
    )))
}
