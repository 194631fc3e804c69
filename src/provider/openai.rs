//! OpenAI-compatible Chat Completions provider.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{AgentError, Result};
use crate::types::{Message, ToolCall};

use super::http::{bearer_headers, shared_client, status_to_error};
use super::{ChatModel, ModelRequest, ModelResponse};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiChatModel {
    model: String,
    api_key: String,
    base_url: String,
}

impl OpenAiChatModel {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>, base_url: Option<String>) -> Self {
        Self {
            model: model.into(),
            api_key: api_key.into(),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }

    fn build_request_body(&self, request: &ModelRequest) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        obj.insert("model".into(), self.model.clone().into());
        obj.insert("messages".into(), messages_to_openai(&request.messages).into());

        if let Some(max) = request.settings.max_tokens {
            obj.insert("max_tokens".into(), max.into());
        }
        if let Some(temp) = request.settings.temperature {
            obj.insert("temperature".into(), temp.into());
        }

        if !request.tools.is_empty() {
            let tool_defs: Vec<serde_json::Value> = request
                .tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            obj.insert("tools".into(), tool_defs.into());
            if let Some(choice) = request.settings.tool_choice {
                obj.insert("tool_choice".into(), choice.to_string().into());
            }
            if let Some(parallel) = request.settings.parallel_tool_calls {
                obj.insert("parallel_tool_calls".into(), parallel.into());
            }
        }

        serde_json::Value::Object(obj)
    }
}

impl std::fmt::Debug for OpenAiChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChatModel")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse> {
        let body = self.build_request_body(request);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(model = %self.model, messages = request.messages.len(), tools = request.tools.len(), "OpenAI complete");

        let resp = shared_client()
            .post(&url)
            .headers(bearer_headers(&self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let data: OpenAiChatResponse = resp.json().await?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::api(status, "No choices in OpenAI response"))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple())),
                name: tc.function.name,
                arguments: serde_json::from_str(&tc.function.arguments)
                    .unwrap_or(serde_json::Value::String(tc.function.arguments)),
            })
            .collect();

        Ok(ModelResponse {
            text: choice.message.content.unwrap_or_default(),
            tool_calls,
        })
    }
}

/// Arguments the model sent as unparseable text go back verbatim.
fn arguments_text(arguments: &serde_json::Value) -> String {
    match arguments {
        serde_json::Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

/// Convert history messages to OpenAI chat messages.
///
/// Assistant text and the tool requests that follow it are folded into one
/// assistant message, as the API requires.
fn messages_to_openai(messages: &[Message]) -> Vec<serde_json::Value> {
    let mut out: Vec<serde_json::Value> = Vec::new();
    let mut open_assistant: Option<usize> = None;

    for message in messages {
        match message {
            Message::System { text } => {
                out.push(serde_json::json!({ "role": "system", "content": text }));
                open_assistant = None;
            }
            Message::UserText { text } => {
                out.push(serde_json::json!({ "role": "user", "content": text }));
                open_assistant = None;
            }
            Message::AssistantText { text } => {
                out.push(serde_json::json!({ "role": "assistant", "content": text }));
                open_assistant = Some(out.len() - 1);
            }
            Message::AssistantToolRequest(call) => {
                let call_json = serde_json::json!({
                    "id": call.id,
                    "type": "function",
                    "function": {
                        "name": call.name,
                        "arguments": arguments_text(&call.arguments),
                    }
                });
                match open_assistant {
                    Some(idx) => {
                        let assistant = &mut out[idx];
                        if assistant.get("tool_calls").is_none() {
                            assistant["tool_calls"] = serde_json::Value::Array(Vec::new());
                        }
                        if let Some(calls) = assistant["tool_calls"].as_array_mut() {
                            calls.push(call_json);
                        }
                    }
                    None => {
                        out.push(serde_json::json!({
                            "role": "assistant",
                            "content": serde_json::Value::Null,
                            "tool_calls": [call_json],
                        }));
                        open_assistant = Some(out.len() - 1);
                    }
                }
            }
            Message::ToolResult(result) => {
                out.push(serde_json::json!({
                    "role": "tool",
                    "tool_call_id": result.call_id,
                    "content": result.content,
                }));
                open_assistant = None;
            }
        }
    }

    out
}

// OpenAI API response types (internal)

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Deserialize)]
struct OpenAiToolCall {
    id: Option<String>,
    function: OpenAiFunction,
}

#[derive(Deserialize)]
struct OpenAiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}
