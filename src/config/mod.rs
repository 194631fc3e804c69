//! Configuration system (layered: code > env > config file > defaults).

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AgentError, Result};
use crate::executor::ExecutionPolicy;
use crate::util::retry::Backoff;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RETRY_BUDGET: u32 = 3;
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

/// Credentials for the Jira REST API.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct JiraCredentials {
    pub server: String,
    pub username: String,
    pub api_token: String,
}

impl JiraCredentials {
    pub fn new(
        server: impl Into<String>,
        username: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            username: username.into(),
            api_token: api_token.into(),
        }
    }

    /// Whether every field is set.
    pub fn is_complete(&self) -> bool {
        !self.server.trim().is_empty()
            && !self.username.trim().is_empty()
            && !self.api_token.trim().is_empty()
    }

    /// Overlay non-blank values, keeping current ones otherwise.
    pub fn overlay(&self, server: Option<&str>, username: Option<&str>, api_token: Option<&str>) -> Self {
        let pick = |over: Option<&str>, base: &str| {
            over.filter(|s| !s.trim().is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| base.to_string())
        };
        Self {
            server: pick(server, &self.server),
            username: pick(username, &self.username),
            api_token: pick(api_token, &self.api_token),
        }
    }
}

impl fmt::Debug for JiraCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JiraCredentials")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("api_token", &redact(&self.api_token))
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

/// Resolved configuration for the agent and its tools.
#[derive(Clone)]
pub struct AgentConfig {
    pub model: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub jira: JiraCredentials,
    /// Bearer token for the data endpoint (`API_KEY`).
    pub data_api_key: Option<String>,
    pub tool_timeout: Duration,
    pub retry_budget: u32,
    pub backoff: Duration,
    pub max_iterations: usize,
}

impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("model", &self.model)
            .field("openai_api_key", &self.openai_api_key.as_deref().map(redact))
            .field("openai_base_url", &self.openai_base_url)
            .field("jira", &self.jira)
            .field("data_api_key", &self.data_api_key.as_deref().map(redact))
            .field("tool_timeout", &self.tool_timeout)
            .field("retry_budget", &self.retry_budget)
            .field("backoff", &self.backoff)
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            openai_api_key: None,
            openai_base_url: None,
            jira: JiraCredentials::default(),
            data_api_key: None,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            retry_budget: DEFAULT_RETRY_BUDGET,
            backoff: DEFAULT_BACKOFF,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// On-disk TOML layout.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    model: Option<String>,
    max_iterations: Option<usize>,
    #[serde(default)]
    openai: OpenAiSection,
    #[serde(default)]
    jira: JiraSection,
    #[serde(default)]
    data: DataSection,
    #[serde(default)]
    executor: ExecutorSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct OpenAiSection {
    api_key: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct JiraSection {
    server: Option<String>,
    username: Option<String>,
    api_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DataSection {
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExecutorSection {
    timeout_secs: Option<u64>,
    retry_budget: Option<u32>,
    backoff_ms: Option<u64>,
}

impl AgentConfig {
    /// Default location of the config file, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "ticket-agent")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load the config file (explicit path, else the default path when it
    /// exists), then apply `.env` and process environment on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();
        match path {
            Some(path) => config.apply_file(path)?,
            None => {
                if let Some(path) = Self::default_path().filter(|p| p.exists()) {
                    config.apply_file(&path)?;
                }
            }
        }
        let _ = dotenvy::dotenv();
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Merge a TOML config file into this config.
    pub fn apply_file(&mut self, path: &Path) -> Result<()> {
        let text = std::fs::read_to_string(path)?;
        self.apply_toml(&text)
            .map_err(|e| AgentError::Configuration(format!("{}: {e}", path.display())))
    }

    /// Merge TOML text into this config.
    pub fn apply_toml(&mut self, text: &str) -> Result<()> {
        let file: ConfigFile =
            toml::from_str(text).map_err(|e| AgentError::Configuration(e.to_string()))?;
        tracing::debug!("applying config file");

        if let Some(model) = file.model {
            self.model = model;
        }
        if let Some(max) = file.max_iterations {
            self.max_iterations = max;
        }
        self.openai_api_key = file.openai.api_key.or(self.openai_api_key.take());
        self.openai_base_url = file.openai.base_url.or(self.openai_base_url.take());
        self.jira = self.jira.overlay(
            file.jira.server.as_deref(),
            file.jira.username.as_deref(),
            file.jira.api_token.as_deref(),
        );
        self.data_api_key = file.data.api_key.or(self.data_api_key.take());
        if let Some(secs) = file.executor.timeout_secs {
            self.tool_timeout = Duration::from_secs(secs);
        }
        if let Some(budget) = file.executor.retry_budget {
            self.retry_budget = budget;
        }
        if let Some(ms) = file.executor.backoff_ms {
            self.backoff = Duration::from_millis(ms);
        }
        Ok(())
    }

    /// Merge variables from an environment lookup into this config.
    ///
    /// Numeric variables that fail to parse are ignored with a warning.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(model) = non_empty("TICKET_AGENT_MODEL") {
            self.model = model;
        }
        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Some(url) = non_empty("OPENAI_BASE_URL") {
            self.openai_base_url = Some(url);
        }
        self.jira = self.jira.overlay(
            non_empty("JIRA_SERVER").as_deref(),
            non_empty("JIRA_USERNAME").as_deref(),
            non_empty("JIRA_API_TOKEN").as_deref(),
        );
        if let Some(key) = non_empty("API_KEY") {
            self.data_api_key = Some(key);
        }

        if let Some(secs) = parse_env::<u64>(&non_empty, "TICKET_AGENT_TOOL_TIMEOUT_SECS") {
            self.tool_timeout = Duration::from_secs(secs);
        }
        if let Some(budget) = parse_env::<u32>(&non_empty, "TICKET_AGENT_RETRY_BUDGET") {
            self.retry_budget = budget;
        }
        if let Some(max) = parse_env::<usize>(&non_empty, "TICKET_AGENT_MAX_ITERATIONS") {
            self.max_iterations = max;
        }
    }

    /// Executor defaults derived from this config.
    pub fn execution_policy(&self) -> ExecutionPolicy {
        ExecutionPolicy {
            timeout: self.tool_timeout,
            retry_budget: self.retry_budget,
            backoff: Backoff::fixed_start(self.backoff),
        }
    }

    pub fn with_jira(mut self, jira: JiraCredentials) -> Self {
        self.jira = jira;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

fn parse_env<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = key, value = %raw, "ignoring unparseable environment value");
            None
        }
    }
}
