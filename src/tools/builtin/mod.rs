//! Built-in tools for the ticket assistant and the data-fetch demo.
//!
//! Each constructor returns an `Arc<dyn Tool>` ready to be placed in a
//! [`ToolSet`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use ticket_agent::config::AgentConfig;
//! use ticket_agent::tools::builtin::jira_tools;
//!
//! let tools = jira_tools(&AgentConfig::default());
//! assert_eq!(tools.len(), 2);
//! ```

pub mod fetch;
pub mod jira;

use std::sync::Arc;

use crate::config::AgentConfig;
use crate::tools::ToolSet;

pub use fetch::{fetch_data_tool, DataSource, HttpDataSource, DEFAULT_DATA_URL, FETCH_DATA};
pub use jira::{
    create_jira_ticket_tool, update_issue_tool, IssueTracker, JiraClient, CREATE_JIRA_TICKET,
    UPDATE_ISSUE,
};

/// Draft update plus ticket creation against the configured Jira server.
pub fn jira_tools(config: &AgentConfig) -> ToolSet {
    ToolSet::default()
        .with(update_issue_tool())
        .with(create_jira_ticket_tool(Arc::new(JiraClient), config.jira.clone()))
}

/// Every built-in tool.
pub fn all_tools(config: &AgentConfig) -> ToolSet {
    let source = HttpDataSource::new(config.data_api_key.clone());
    jira_tools(config).with(fetch_data_tool(Arc::new(source)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_tools_registers_each_builtin_once() {
        let tools = all_tools(&AgentConfig::default());
        assert_eq!(tools.names(), vec![UPDATE_ISSUE, CREATE_JIRA_TICKET, FETCH_DATA]);
    }
}
