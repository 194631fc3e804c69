//! Tests for file-based configuration.

use std::io::Write;
use std::time::Duration;

use pretty_assertions::assert_eq;

use ticket_agent::config::{AgentConfig, DEFAULT_MODEL, DEFAULT_RETRY_BUDGET};
use ticket_agent::error::AgentError;

fn config_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn file_values_are_layered_over_defaults() {
    let file = config_file(
        r#"
[jira]
server = "https://acme.atlassian.net"
username = "bot@acme.io"
api_token = "tok"

[data]
api_key = "data-key"

[executor]
timeout_secs = 4
"#,
    );

    let mut config = AgentConfig::default();
    config.apply_file(file.path()).unwrap();

    assert!(config.jira.is_complete());
    assert_eq!(config.data_api_key.as_deref(), Some("data-key"));
    assert_eq!(config.tool_timeout, Duration::from_secs(4));
    assert_eq!(config.retry_budget, DEFAULT_RETRY_BUDGET);
    assert_eq!(config.model, DEFAULT_MODEL);
}

#[test]
fn malformed_file_names_the_path() {
    let file = config_file("[executor]\ntimeout_secs = \"soon\"\n");
    let err = AgentConfig::default().apply_file(file.path()).unwrap_err();
    match err {
        AgentError::Configuration(message) => {
            assert!(message.contains(&file.path().display().to_string()), "{message}");
        }
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = AgentConfig::load(Some(&dir.path().join("missing.toml"))).unwrap_err();
    assert!(matches!(err, AgentError::Io(_)));
}

#[test]
fn file_policy_feeds_the_executor() {
    let file = config_file("[executor]\nretry_budget = 7\nbackoff_ms = 50\n");
    let mut config = AgentConfig::default();
    config.apply_file(file.path()).unwrap();

    let policy = config.execution_policy();
    assert_eq!(policy.retry_budget, 7);
    assert_eq!(policy.backoff.nominal(0), Duration::from_millis(50));
}
