//! Issue draft carried through a conversation, and the validated record sent
//! to the tracker.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The free-text issue the user is shaping before it is created.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueDraft {
    pub content: String,
}

impl IssueDraft {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Fields of an issue to create.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueRecord {
    pub project_key: String,
    pub summary: String,
    pub description: String,
    pub issue_type: String,
}

fn project_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("static pattern"))
}

impl IssueRecord {
    /// Build a record, normalizing the project key and rejecting blank fields.
    pub fn new(
        project_key: &str,
        summary: &str,
        description: &str,
        issue_type: &str,
    ) -> Result<Self, String> {
        let project_key = project_key.trim().to_uppercase();
        if project_key.is_empty() {
            return Err("project key cannot be empty".into());
        }
        if !project_key_pattern().is_match(&project_key) {
            return Err(format!("'{project_key}' is not a valid project key"));
        }
        let summary = summary.trim();
        if summary.is_empty() {
            return Err("summary cannot be empty".into());
        }
        let issue_type = issue_type.trim();
        if issue_type.is_empty() {
            return Err("issue type cannot be empty".into());
        }
        Ok(Self {
            project_key,
            summary: summary.to_string(),
            description: description.to_string(),
            issue_type: issue_type.to_string(),
        })
    }
}
