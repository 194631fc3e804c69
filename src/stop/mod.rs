//! Termination predicates over conversation history.

use crate::types::ConversationHistory;

/// Decides whether a conversation is complete.
pub trait TerminationPredicate: Send + Sync {
    fn is_complete(&self, history: &ConversationHistory) -> bool;
}

/// Complete once the most recent tool result contains every keyword,
/// case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionSignature {
    keywords: Vec<String>,
    tools: Option<Vec<String>>,
}

impl Default for CompletionSignature {
    fn default() -> Self {
        Self::new(["create", "issue"])
    }
}

impl CompletionSignature {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.into().to_lowercase())
                .collect(),
            tools: None,
        }
    }

    /// Only consider results of calls to the named tools. The most recent
    /// such result is checked even when other tools ran after it.
    pub fn for_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = Some(tools.into_iter().map(Into::into).collect());
        self
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    fn matches(&self, content: &str) -> bool {
        let content = content.to_lowercase();
        self.keywords.iter().all(|k| content.contains(k.as_str()))
    }
}

impl TerminationPredicate for CompletionSignature {
    fn is_complete(&self, history: &ConversationHistory) -> bool {
        let result = match &self.tools {
            None => history.last_tool_result(),
            Some(tools) => history.tool_results().rev().find(|result| {
                history
                    .call_for_result(result)
                    .is_some_and(|call| tools.iter().any(|t| *t == call.name))
            }),
        };
        result.is_some_and(|result| self.matches(&result.content))
    }
}

/// Complete when a custom predicate returns true.
pub struct PredicateStop<F: Fn(&ConversationHistory) -> bool + Send + Sync> {
    predicate: F,
}

impl<F: Fn(&ConversationHistory) -> bool + Send + Sync> PredicateStop<F> {
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F: Fn(&ConversationHistory) -> bool + Send + Sync> TerminationPredicate for PredicateStop<F> {
    fn is_complete(&self, history: &ConversationHistory) -> bool {
        (self.predicate)(history)
    }
}

/// Never complete; the loop ends only on a final answer, closed input or a
/// failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverStop;

impl TerminationPredicate for NeverStop {
    fn is_complete(&self, _history: &ConversationHistory) -> bool {
        false
    }
}
