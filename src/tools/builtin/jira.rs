//! Jira tools: draft updates and ticket creation.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::JiraCredentials;
use crate::error::{AgentError, Result};
use crate::provider::http::{error_message, shared_client};
use crate::tools::{ParameterSchema, Tool, ToolResponse, ToolSpec};
use crate::types::{IssueDraft, IssueRecord};

pub const UPDATE_ISSUE: &str = "update_issue";
pub const CREATE_JIRA_TICKET: &str = "create_jira_ticket";

/// Remote issue tracker.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Create an issue and return its key.
    async fn create_issue(&self, credentials: &JiraCredentials, record: &IssueRecord) -> Result<String>;
}

/// Jira Cloud / Server REST v2 client.
#[derive(Debug, Clone, Copy, Default)]
pub struct JiraClient;

#[derive(Deserialize)]
struct CreatedIssue {
    key: String,
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn create_issue(&self, credentials: &JiraCredentials, record: &IssueRecord) -> Result<String> {
        let url = format!("{}/rest/api/2/issue", credentials.server.trim_end_matches('/'));
        let body = serde_json::json!({
            "fields": {
                "project": { "key": record.project_key },
                "summary": record.summary,
                "description": record.description,
                "issuetype": { "name": record.issue_type },
            }
        });

        let resp = shared_client()
            .post(&url)
            .basic_auth(&credentials.username, Some(&credentials.api_token))
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AgentError::api(status, error_message(&text)));
        }

        let created: CreatedIssue = resp.json().await?;
        Ok(created.key)
    }
}

/// Tool that replaces the conversation's issue draft.
pub fn update_issue_tool() -> Arc<dyn Tool> {
    Arc::new(ToolSpec::new(
        UPDATE_ISSUE,
        "Update the issue draft with the provided content.",
        ParameterSchema::object()
            .string("content", "Full text of the updated issue", true)
            .build(),
        |args, _ctx| async move {
            let content = args.get_str("content")?.to_string();
            let message = format!("The issue has been updated! The current issue is: \n{content}");
            Ok(ToolResponse::new(message).with_draft(IssueDraft::new(content)))
        },
    ))
}

/// Tool that creates a Jira issue.
///
/// Never fails on remote errors: the failure text is returned to the model as
/// `Failed to create issue: <error>` so it can react. Blank credential
/// arguments fall back to `defaults`.
pub fn create_jira_ticket_tool(tracker: Arc<dyn IssueTracker>, defaults: JiraCredentials) -> Arc<dyn Tool> {
    Arc::new(ToolSpec::new(
        CREATE_JIRA_TICKET,
        "Create a Jira issue. Only call this once the user has confirmed the issue details. \
         The Jira server is a URL such as https://<domain>.atlassian.net; credentials are optional \
         when configured.",
        ParameterSchema::object()
            .string("project_key", "Key of the Jira project, e.g. OPS", true)
            .string("summary", "One-line issue summary", true)
            .string_or("description", "Issue description", "")
            .string_or("issue_type", "Issue type name", "Task")
            .string_or("jira_server", "Jira server URL", "")
            .string_or("jira_username", "Jira username or email", "")
            .string_or("jira_api_token", "Jira API token", "")
            .build(),
        move |args, _ctx| {
            let tracker = Arc::clone(&tracker);
            let credentials = defaults.overlay(
                args.get_str_opt("jira_server"),
                args.get_str_opt("jira_username"),
                args.get_str_opt("jira_api_token"),
            );
            async move {
                let record = IssueRecord::new(
                    args.get_str("project_key")?,
                    args.get_str("summary")?,
                    args.get_str_opt("description").unwrap_or_default(),
                    args.get_str_opt("issue_type").unwrap_or("Task"),
                );
                let outcome = match record {
                    Ok(record) => create(tracker.as_ref(), &credentials, &record).await,
                    Err(message) => Err(message),
                };
                Ok(ToolResponse::new(match outcome {
                    Ok(url) => format!("Issue created: {url}"),
                    Err(message) => format!("Failed to create issue: {message}"),
                }))
            }
        },
    ))
}

async fn create(
    tracker: &dyn IssueTracker,
    credentials: &JiraCredentials,
    record: &IssueRecord,
) -> std::result::Result<String, String> {
    if !credentials.is_complete() {
        return Err("missing Jira credentials (server, username and API token are required)".into());
    }
    match tracker.create_issue(credentials, record).await {
        Ok(key) => {
            info!(project = %record.project_key, key = %key, "issue created");
            Ok(format!("{}/browse/{key}", credentials.server.trim_end_matches('/')))
        }
        Err(err) => {
            warn!(project = %record.project_key, error = %err, "issue creation failed");
            Err(err.to_string())
        }
    }
}
