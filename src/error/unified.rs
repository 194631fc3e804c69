//! Error classification and recovery hints.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    Authentication,
    RateLimit,
    Network,
    Timeout,
    Server,
    Api,
    Configuration,
    Serialization,
    InvalidArguments,
    ToolExecution,
    Unknown,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    RetryWithBackoff,
    CheckCredentials,
    CheckConfiguration,
    IncreaseTimeout,
    FixArguments,
    CheckToolImplementation,
    ContactSupport,
}

impl ErrorCategory {
    /// Suggest a recovery action for this category.
    pub fn recovery_suggestion(self) -> RecoverySuggestion {
        match self {
            Self::Authentication => RecoverySuggestion::CheckCredentials,
            Self::RateLimit | Self::Network | Self::Server => RecoverySuggestion::RetryWithBackoff,
            Self::Timeout => RecoverySuggestion::IncreaseTimeout,
            Self::Configuration => RecoverySuggestion::CheckConfiguration,
            Self::InvalidArguments => RecoverySuggestion::FixArguments,
            Self::ToolExecution => RecoverySuggestion::CheckToolImplementation,
            _ => RecoverySuggestion::ContactSupport,
        }
    }
}

impl RecoverySuggestion {
    /// One-line hint for console output.
    pub fn hint(self) -> &'static str {
        match self {
            Self::RetryWithBackoff => "the service may be busy or unreachable; try again shortly",
            Self::CheckCredentials => "check the API key or Jira credentials",
            Self::CheckConfiguration => "check the config file and environment variables",
            Self::IncreaseTimeout => "raise the tool timeout or retry budget",
            Self::FixArguments => "check the tool arguments",
            Self::CheckToolImplementation => "the tool failed; see the log for details",
            Self::ContactSupport => "see the log for details",
        }
    }
}
