//! Error types for ticket-agent.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

/// Failure of a single tool invocation, as seen by the executor.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Arguments did not satisfy the tool's parameter schema. Never retried.
    #[error("invalid arguments for '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("tool '{tool}' timed out after {timeout_ms}ms")]
    Timeout { tool: String, timeout_ms: u64 },

    #[error("tool '{tool}' failed: {message}")]
    RemoteFailure {
        tool: String,
        message: String,
        status: Option<u16>,
    },

    #[error("tool '{tool}' gave up after {attempts} attempt(s){}", describe_last(.last))]
    RetriesExhausted {
        tool: String,
        attempts: u32,
        last: Option<Box<ToolError>>,
    },

    #[error("Tool '{0}' not found")]
    NotFound(String),
}

fn describe_last(last: &Option<Box<ToolError>>) -> String {
    last.as_ref().map(|e| format!(": {e}")).unwrap_or_default()
}

impl ToolError {
    pub fn invalid_arguments(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn remote(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteFailure {
            tool: tool.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn remote_status(tool: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::RemoteFailure {
            tool: tool.into(),
            message: message.into(),
            status: Some(status),
        }
    }

    /// Name of the tool this error belongs to.
    pub fn tool_name(&self) -> &str {
        match self {
            Self::InvalidArguments { tool, .. }
            | Self::Timeout { tool, .. }
            | Self::RemoteFailure { tool, .. }
            | Self::RetriesExhausted { tool, .. } => tool,
            Self::NotFound(name) => name,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidArguments { .. } => ErrorCategory::InvalidArguments,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::RemoteFailure { status, .. } => match status {
                Some(401 | 403) => ErrorCategory::Authentication,
                Some(429) => ErrorCategory::RateLimit,
                Some(500..=599) => ErrorCategory::Server,
                Some(_) => ErrorCategory::Api,
                None => ErrorCategory::Network,
            },
            Self::RetriesExhausted { .. } | Self::NotFound(_) => ErrorCategory::ToolExecution,
        }
    }

    /// Whether the executor may spend retry budget on this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::RemoteFailure { .. })
    }
}

/// Primary error type for all ticket-agent operations.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Conversation exceeded {0} iterations")]
    IterationLimit(usize),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl AgentError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Network(_) | Self::Io(_) => ErrorCategory::Network,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::Tool(err) => err.category(),
            Self::IterationLimit(_) | Self::InvalidState(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether this error is potentially retryable by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit
                | ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::Server
        )
    }

    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        self.category().recovery_suggestion()
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, AgentError>;
