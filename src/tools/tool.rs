//! Tool trait, closure-based tool wrapper and the tool set a conversation
//! exposes to the model.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::arguments::ToolArguments;
use super::schema::ParameterSchema;
use crate::error::ToolError;
use crate::executor::ExecutionPolicy;
use crate::provider::ToolDefinition;
use crate::types::IssueDraft;

/// Context available during tool execution.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub tool_call_id: Option<String>,
    /// Snapshot of the conversation's issue draft.
    pub draft: IssueDraft,
    progress: Option<mpsc::UnboundedSender<serde_json::Value>>,
}

impl ToolContext {
    pub fn new(draft: IssueDraft) -> Self {
        Self {
            draft,
            ..Self::default()
        }
    }

    pub fn with_call_id(mut self, id: impl Into<String>) -> Self {
        self.tool_call_id = Some(id.into());
        self
    }

    pub(crate) fn with_progress(mut self, tx: mpsc::UnboundedSender<serde_json::Value>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Record a partial-progress entry for the current attempt.
    pub fn report_progress(&self, entry: impl Into<serde_json::Value>) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(entry.into());
        }
    }
}

/// Raw value returned by a tool operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResponse {
    pub content: serde_json::Value,
    /// Replacement for the conversation's draft, when the tool changed it.
    pub draft: Option<IssueDraft>,
}

impl ToolResponse {
    pub fn new(content: impl Into<serde_json::Value>) -> Self {
        Self {
            content: content.into(),
            draft: None,
        }
    }

    pub fn with_draft(mut self, draft: IssueDraft) -> Self {
        self.draft = Some(draft);
        self
    }
}

/// Core tool trait. Implement it to add a custom tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the model calls).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Declared parameters.
    fn parameters(&self) -> &ParameterSchema;

    /// Per-tool timeout and retry override.
    fn policy(&self) -> Option<&ExecutionPolicy> {
        None
    }

    /// Execute the tool with validated arguments.
    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolContext,
    ) -> Result<ToolResponse, ToolError>;

    /// Definition sent to the model.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters().to_json_schema(),
        }
    }
}

/// Type alias for the tool handler function.
type ToolHandler = dyn Fn(
        ToolArguments,
        ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<ToolResponse, ToolError>> + Send>>
    + Send
    + Sync;

/// Closure-based tool: name, schema and the bound operation.
pub struct ToolSpec {
    name: String,
    description: String,
    parameters: ParameterSchema,
    policy: Option<ExecutionPolicy>,
    handler: Arc<ToolHandler>,
}

impl ToolSpec {
    /// Create a tool from a closure.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResponse, ToolError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            policy: None,
            handler: Arc::new(move |args, ctx| Box::pin(handler(args, ctx))),
        }
    }

    pub fn with_policy(mut self, policy: ExecutionPolicy) -> Self {
        self.policy = Some(policy);
        self
    }
}

#[async_trait]
impl Tool for ToolSpec {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &ParameterSchema {
        &self.parameters
    }

    fn policy(&self) -> Option<&ExecutionPolicy> {
        self.policy.as_ref()
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolContext,
    ) -> Result<ToolResponse, ToolError> {
        (self.handler)(args.clone(), ctx.clone()).await
    }
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Named tools available to one conversation.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self { tools }
    }

    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
