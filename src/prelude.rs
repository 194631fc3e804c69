//! Convenience re-exports for common use.

pub use crate::agent_loop::{
    ConversationController, ConversationState, FinalAnswerPolicy, InputSource, LoopEvent, Phase,
    RunOutcome, TerminationReason,
};
pub use crate::config::{AgentConfig, JiraCredentials};
pub use crate::error::{AgentError, Result, ToolError};
pub use crate::executor::{execute, ExecutionPolicy, ToolExecutor, ToolOutput};
pub use crate::provider::{create_chat_model, ChatModel, ModelRequest, ModelResponse};
pub use crate::stop::{CompletionSignature, TerminationPredicate};
pub use crate::tools::builtin::{all_tools, jira_tools};
pub use crate::tools::{ParameterSchema, Tool, ToolArguments, ToolContext, ToolResponse, ToolSet, ToolSpec};
pub use crate::types::{ConversationHistory, IssueDraft, Message, ToolCall, ToolResult};
