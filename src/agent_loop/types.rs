//! Core state types for the conversation loop.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{AgentError, Result};
use crate::types::{ConversationHistory, IssueDraft, Message};

/// Why a conversation stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TerminationReason {
    /// The input source had no more lines.
    InputClosed,
    /// The termination predicate matched the history.
    CompletionSignature,
    /// The model answered without requesting tools.
    FinalAnswer,
    /// A model call, input read or tool call failed terminally.
    Failed,
}

/// Controller phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "phase", content = "reason", rename_all = "snake_case")]
pub enum Phase {
    AwaitingUserInput,
    AwaitingModelResponse,
    Dispatching,
    Terminated(TerminationReason),
}

impl Phase {
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated(_))
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingUserInput => f.write_str("awaiting_user_input"),
            Self::AwaitingModelResponse => f.write_str("awaiting_model_response"),
            Self::Dispatching => f.write_str("dispatching"),
            Self::Terminated(reason) => write!(f, "terminated({reason})"),
        }
    }
}

/// What to do when the model answers without requesting a tool.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FinalAnswerPolicy {
    /// Stop with [`TerminationReason::FinalAnswer`].
    #[default]
    Terminate,
    /// Hand the turn back to the user.
    AwaitUser,
}

/// Everything one conversation owns: its history, the issue draft and the
/// current phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationState {
    history: ConversationHistory,
    draft: IssueDraft,
    phase: Phase,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            history: ConversationHistory::new(),
            draft: IssueDraft::default(),
            phase: Phase::AwaitingUserInput,
        }
    }
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from an existing history.
    ///
    /// The phase is derived from the last message: pending tool requests mean
    /// `Dispatching`, a user message or tool result means
    /// `AwaitingModelResponse`, anything else `AwaitingUserInput`.
    pub fn from_history(history: ConversationHistory) -> Self {
        let phase = if !history.pending_tool_calls().is_empty() {
            Phase::Dispatching
        } else {
            match history.last() {
                Some(Message::UserText { .. }) | Some(Message::ToolResult(_)) => {
                    Phase::AwaitingModelResponse
                }
                _ => Phase::AwaitingUserInput,
            }
        };
        Self {
            history,
            draft: IssueDraft::default(),
            phase,
        }
    }

    pub fn with_draft(mut self, draft: IssueDraft) -> Self {
        self.draft = draft;
        self
    }

    /// Append a user message and hand the turn to the model.
    pub fn push_user(&mut self, text: impl Into<String>) -> Result<()> {
        if self.phase.is_terminated() {
            return Err(AgentError::InvalidState(format!(
                "cannot add user input to a conversation in phase {}",
                self.phase
            )));
        }
        self.history.push(Message::user(text));
        self.phase = Phase::AwaitingModelResponse;
        Ok(())
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn draft(&self) -> &IssueDraft {
        &self.draft
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_terminated(&self) -> bool {
        self.phase.is_terminated()
    }

    pub(crate) fn append(&mut self, message: Message) {
        self.history.push(message);
    }

    pub(crate) fn set_draft(&mut self, draft: IssueDraft) {
        self.draft = draft;
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }
}

/// Result of [`ConversationController::run`](super::ConversationController::run).
#[derive(Debug)]
pub struct RunOutcome {
    pub state: ConversationState,
    /// Model calls made during the run.
    pub iterations: usize,
    pub finished_at: DateTime<Utc>,
    pub error: Option<AgentError>,
}

impl RunOutcome {
    pub(crate) fn new(state: ConversationState, iterations: usize, error: Option<AgentError>) -> Self {
        Self {
            state,
            iterations,
            finished_at: Utc::now(),
            error,
        }
    }

    pub fn reason(&self) -> Option<TerminationReason> {
        match self.state.phase() {
            Phase::Terminated(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<ConversationState> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.state),
        }
    }
}
