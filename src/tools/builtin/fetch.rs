//! Data fetch tool: query a REST endpoint and return its JSON body.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use tracing::{debug, info};

use crate::error::ToolError;
use crate::provider::http::{error_message, shared_client};
use crate::tools::{FieldSpec, ParameterSchema, Tool, ToolResponse, ToolSpec, Validator};

pub const FETCH_DATA: &str = "fetch_data";
pub const DEFAULT_DATA_URL: &str = "https://api.example.com/data";

/// Remote data endpoint.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch the JSON body for `query` from `api_url`.
    async fn fetch(&self, api_url: &str, query: &str) -> Result<serde_json::Value, ToolError>;
}

/// `GET api_url?q=query`, with a bearer token when one is configured.
#[derive(Clone, Default)]
pub struct HttpDataSource {
    api_key: Option<String>,
}

impl HttpDataSource {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }
}

impl std::fmt::Debug for HttpDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDataSource")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn fetch(&self, api_url: &str, query: &str) -> Result<serde_json::Value, ToolError> {
        let mut request = shared_client().get(api_url).query(&[("q", query)]);
        if let Some(key) = &self.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| ToolError::invalid_arguments(FETCH_DATA, format!("invalid API key: {e}")))?;
            request = request.header(AUTHORIZATION, value);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| ToolError::remote(FETCH_DATA, e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ToolError::remote_status(
                FETCH_DATA,
                status.as_u16(),
                format!("{status}: {}", error_message(&body)),
            ));
        }

        resp.json()
            .await
            .map_err(|e| ToolError::remote_status(FETCH_DATA, status.as_u16(), format!("invalid JSON body: {e}")))
    }
}

/// Tool that fetches data for a query and wraps it as `{"data": <body>}`.
///
/// Remote failures are returned as errors so the executor can retry them.
pub fn fetch_data_tool(source: Arc<dyn DataSource>) -> Arc<dyn Tool> {
    Arc::new(ToolSpec::new(
        FETCH_DATA,
        "Fetch data for a query from a REST API endpoint.",
        ParameterSchema::object()
            .field(
                FieldSpec::string("query", "Query string to extract data")
                    .required()
                    .validate(Validator::NonBlank),
            )
            .string_or("api_url", "API endpoint", DEFAULT_DATA_URL)
            .build(),
        move |args, ctx| {
            let source = Arc::clone(&source);
            async move {
                let query = args.get_str("query")?;
                let api_url = args.get_str_opt("api_url").unwrap_or(DEFAULT_DATA_URL);

                info!(api_url, query, "Calling API");
                ctx.report_progress(serde_json::json!({ "partial": "Calling API" }));
                let data = source.fetch(api_url, query).await?;
                debug!(api_url, "API call succeeded");
                ctx.report_progress(serde_json::json!({ "partial": "Processing complete" }));

                Ok(ToolResponse::new(serde_json::json!({ "data": data })))
            }
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ToolArguments, ToolContext};
    use serde_json::json;
    use std::sync::Mutex;

    struct FixedSource {
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl DataSource for FixedSource {
        async fn fetch(&self, api_url: &str, query: &str) -> Result<serde_json::Value, ToolError> {
            self.calls
                .lock()
                .unwrap()
                .push((api_url.to_string(), query.to_string()));
            Ok(json!({ "id": 1 }))
        }
    }

    #[tokio::test]
    async fn wraps_body_and_applies_default_url() {
        let source = Arc::new(FixedSource {
            calls: Mutex::new(Vec::new()),
        });
        let tool = fetch_data_tool(source.clone());
        let validated = tool.parameters().validate(&json!({ "query": "todos" })).unwrap();
        let args = ToolArguments::new(FETCH_DATA, validated);

        let out = tool.execute(&args, &ToolContext::default()).await.unwrap();
        assert_eq!(out.content, json!({ "data": { "id": 1 } }));
        assert_eq!(
            source.calls.lock().unwrap()[0],
            (DEFAULT_DATA_URL.to_string(), "todos".to_string())
        );
    }

    #[test]
    fn blank_query_is_rejected() {
        let tool = fetch_data_tool(Arc::new(HttpDataSource::default()));
        let err = tool.parameters().validate(&json!({ "query": "  " })).unwrap_err();
        assert!(err.contains("query"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let source = HttpDataSource::new(Some("secret".into()));
        assert!(!format!("{source:?}").contains("secret"));
        assert!(HttpDataSource::new(Some(" ".into())).api_key.is_none());
    }
}
