//! Tests for the data fetch tool against a mock REST endpoint.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ticket_agent::error::ToolError;
use ticket_agent::executor::{ExecutionPolicy, ToolExecutor};
use ticket_agent::tools::builtin::{fetch_data_tool, HttpDataSource};
use ticket_agent::tools::ToolContext;
use ticket_agent::util::retry::Backoff;

fn executor(budget: u32) -> ToolExecutor {
    ToolExecutor::new(
        ExecutionPolicy::new(Duration::from_secs(5), budget).with_backoff(Backoff::constant(Duration::from_millis(10))),
    )
}

#[tokio::test]
async fn returns_body_under_data_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/todos"))
        .and(query_param("q", "test data"))
        .and(header("authorization", "Bearer data-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1, "title": "delectus" })))
        .expect(1)
        .mount(&server)
        .await;

    let tool = fetch_data_tool(Arc::new(HttpDataSource::new(Some("data-key".into()))));
    let out = executor(3)
        .run(
            &tool,
            &json!({ "query": "test data", "api_url": format!("{}/todos", server.uri()) }),
            ToolContext::default(),
        )
        .await
        .unwrap();

    assert_eq!(out.content, json!({ "data": { "id": 1, "title": "delectus" } }));
    assert_eq!(
        out.partials,
        vec![json!({ "partial": "Calling API" }), json!({ "partial": "Processing complete" })]
    );
}

#[tokio::test]
async fn server_errors_are_retried_up_to_the_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .expect(3)
        .mount(&server)
        .await;

    let tool = fetch_data_tool(Arc::new(HttpDataSource::new(None)));
    let err = executor(3)
        .run(
            &tool,
            &json!({ "query": "q", "api_url": format!("{}/data", server.uri()) }),
            ToolContext::default(),
        )
        .await
        .unwrap_err();

    match err {
        ToolError::RetriesExhausted { attempts, last, .. } => {
            assert_eq!(attempts, 3);
            assert!(matches!(
                last.as_deref(),
                Some(ToolError::RemoteFailure { status: Some(500), .. })
            ));
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
}

#[tokio::test]
async fn recovers_when_the_endpoint_comes_back() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2, 3])))
        .mount(&server)
        .await;

    let tool = fetch_data_tool(Arc::new(HttpDataSource::new(None)));
    let out = executor(3)
        .run(
            &tool,
            &json!({ "query": "q", "api_url": format!("{}/data", server.uri()) }),
            ToolContext::default(),
        )
        .await
        .unwrap();

    assert_eq!(out.attempts, 2);
    assert_eq!(out.text(), r#"{"data":[1,2,3]}"#);
}

#[tokio::test]
async fn blank_query_never_reaches_the_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let tool = fetch_data_tool(Arc::new(HttpDataSource::new(None)));
    let err = executor(3)
        .run(&tool, &json!({ "query": " ", "api_url": server.uri() }), ToolContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::InvalidArguments { .. }));
}
