//! Shared HTTP client and error mapping.

use std::sync::OnceLock;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::error::AgentError;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .pool_max_idle_per_host(10)
            .build()
            .expect("Failed to build HTTP client")
    })
}

/// Build default headers for a Bearer-token API.
pub fn bearer_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Map a non-success HTTP status to an error.
pub fn status_to_error(status: u16, body: &str) -> AgentError {
    match status {
        401 | 403 => AgentError::Authentication(error_message(body)),
        429 => AgentError::RateLimited {
            retry_after_ms: extract_retry_after(body),
        },
        _ => AgentError::api(status, error_message(body)),
    }
}

/// Pull a readable message out of a JSON error body, else return it as-is.
///
/// Understands OpenAI's `{"error": {"message"}}` and Jira's
/// `{"errorMessages": [...], "errors": {field: msg}}`.
pub fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };
    if let Some(message) = value
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
    {
        return message.to_string();
    }

    let mut parts: Vec<String> = value
        .get("errorMessages")
        .and_then(|m| m.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|m| m.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    if let Some(errors) = value.get("errors").and_then(|e| e.as_object()) {
        for (field, message) in errors {
            let message = message.as_str().map(str::to_string).unwrap_or_else(|| message.to_string());
            parts.push(format!("{field}: {message}"));
        }
    }
    if parts.is_empty() {
        body.trim().to_string()
    } else {
        parts.join("; ")
    }
}

fn extract_retry_after(body: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|r| r.as_f64())
                .map(|s| (s * 1000.0) as u64)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_auth_and_rate_limit_statuses() {
        assert!(matches!(status_to_error(401, "nope"), AgentError::Authentication(_)));
        match status_to_error(429, r#"{"error": {"retry_after": 1.5}}"#) {
            AgentError::RateLimited { retry_after_ms } => assert_eq!(retry_after_ms, Some(1500)),
            other => panic!("expected rate limit, got {other:?}"),
        }
        assert!(matches!(status_to_error(500, "boom"), AgentError::Api { status: 500, .. }));
    }

    #[test]
    fn extracts_openai_error_message() {
        let body = r#"{"error": {"message": "model not found", "type": "invalid_request_error"}}"#;
        assert_eq!(error_message(body), "model not found");
    }

    #[test]
    fn extracts_jira_error_messages() {
        let body = r#"{"errorMessages": ["Project does not exist"], "errors": {"summary": "required"}}"#;
        assert_eq!(error_message(body), "Project does not exist; summary: required");
    }

    #[test]
    fn falls_back_to_raw_body() {
        assert_eq!(error_message("  Bad Gateway \n"), "Bad Gateway");
        assert_eq!(error_message("{}"), "{}");
    }
}
