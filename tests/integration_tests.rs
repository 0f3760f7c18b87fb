//! End-to-end scenarios driving the full stack (parser, request builder,
//! pipeline, transport) against a real HTTP server.

use futures_util::StreamExt;
use relay_runtime::builder::{ArgValue, CallArgs};
use relay_runtime::client::{ApiClient, PipelineBuilder};
use relay_runtime::codec::DefaultCodec;
use relay_runtime::plan::{BodyWireType, ErrorDescriptor, MethodPlan, MethodPlanRegistry, ReturnShape};
use relay_runtime::policy::builtin::retry::RetryConfig;
use relay_runtime::policy::PipelineOptions;
use relay_runtime::transport::ReqwestTransport;
use relay_runtime::{Error, InvocationResult, Verb};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ITEM_SPEC: &str = r#"
openapi: 3.0.0
info: { title: Test, version: "1.0" }
servers:
  - url: PLACEHOLDER
paths:
  /items/{id}:
    get:
      operationId: getItem
      parameters:
        - name: id
          in: path
          required: true
          schema: { type: string }
        - name: X-Debug
          in: header
          required: false
          schema: { type: string }
      responses:
        "200": { description: ok }
  /items:
    post:
      operationId: createItem
      requestBody:
        required: true
        content:
          application/json:
            schema: { type: object }
      responses:
        "201": { description: created }
  /items/{id}/exists:
    head:
      operationId: itemExists
      parameters:
        - name: id
          in: path
          required: true
          schema: { type: string }
      responses:
        "200": { description: exists }
  /flaky:
    get:
      operationId: getFlaky
      responses:
        "200": { description: ok }
"#;

fn spec_for(server: &MockServer) -> String {
    ITEM_SPEC.replace("PLACEHOLDER", &server.uri())
}

fn unauthenticated_pipeline() -> Arc<relay_runtime::Pipeline> {
    Arc::new(
        PipelineBuilder::new()
            .with_default_unauthenticated()
            .build(Arc::new(ReqwestTransport::default())),
    )
}

#[tokio::test]
async fn simple_get_with_path_parameter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "abc"})))
        .mount(&server)
        .await;

    let client = ApiClient::from_description(&spec_for(&server), unauthenticated_pipeline(), Arc::new(DefaultCodec)).unwrap();
    let args = CallArgs::new().with("id", ArgValue::Text("abc".to_string()));
    let result = client.invoke("getItem", args).await.unwrap();
    let InvocationResult::Typed(Some(body)) = result else {
        panic!("expected a typed body")
    };
    assert_eq!(body, serde_json::json!({"id": "abc"}));
}

#[tokio::test]
async fn post_json_body_with_overriding_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/items"))
        .and(header("X-Debug", "on"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": "new"})))
        .mount(&server)
        .await;

    let client = ApiClient::from_description(&spec_for(&server), unauthenticated_pipeline(), Arc::new(DefaultCodec)).unwrap();
    let args = CallArgs::new()
        .with("$body", ArgValue::Json(serde_json::json!({"name": "widget"})))
        .with("X-Debug", ArgValue::Text("on".to_string()));
    let result = client.invoke("createItem", args).await.unwrap();
    assert!(matches!(result, InvocationResult::Typed(_)));
}

#[tokio::test]
async fn paging_via_absolute_url_preserves_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page2"))
        .and(query_param("x", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "page2"})))
        .mount(&server)
        .await;

    let client = ApiClient::from_description(&spec_for(&server), unauthenticated_pipeline(), Arc::new(DefaultCodec)).unwrap();
    let next_link = format!("{}/page2?x=1", server.uri());
    let args = CallArgs::new().with("id", ArgValue::Text(next_link));
    let result = client.invoke("getItem", args).await.unwrap();
    let InvocationResult::Typed(Some(body)) = result else {
        panic!("expected a typed body")
    };
    assert_eq!(body, serde_json::json!({"id": "page2"}));
}

#[tokio::test]
async fn unexpected_status_surfaces_decoded_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({"error": "not found"})))
        .mount(&server)
        .await;

    let client = ApiClient::from_description(&spec_for(&server), unauthenticated_pipeline(), Arc::new(DefaultCodec)).unwrap();
    let args = CallArgs::new().with("id", ArgValue::Text("missing".to_string()));
    let err = client.invoke("getItem", args).await.unwrap_err();
    let Error::UnexpectedStatus { status, message, .. } = err else {
        panic!("expected UnexpectedStatus")
    };
    assert_eq!(status, 404);
    assert!(message.contains("not found"));
}

#[tokio::test]
async fn head_request_surfaces_success_as_boolean() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/items/abc/exists"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = ApiClient::from_description(&spec_for(&server), unauthenticated_pipeline(), Arc::new(DefaultCodec)).unwrap();
    let args = CallArgs::new().with("id", ArgValue::Text("abc".to_string()));
    let result = client.invoke("itemExists", args).await.unwrap();
    assert!(matches!(result, InvocationResult::Boolean(true)));
}

#[tokio::test]
async fn retries_on_503_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&server)
        .await;

    let pipeline = Arc::new(
        PipelineBuilder::new()
            .with_default_unauthenticated()
            .with_options(PipelineOptions {
                retry: RetryConfig {
                    max_attempts: 3,
                    initial_delay_ms: 5,
                    max_delay_ms: 50,
                    backoff_multiplier: 2.0,
                    jitter: false,
                },
                ..PipelineOptions::default()
            })
            .build(Arc::new(ReqwestTransport::default())),
    );

    let client = ApiClient::from_description(&spec_for(&server), pipeline, Arc::new(DefaultCodec)).unwrap();
    let started = std::time::Instant::now();
    let result = client.invoke("getFlaky", CallArgs::new()).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(5));
    let InvocationResult::Typed(Some(body)) = result else {
        panic!("expected a typed body")
    };
    assert_eq!(body, serde_json::json!({"ok": true}));
}

#[tokio::test]
async fn default_headers_are_applied_but_not_overriding() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items/abc"))
        .and(header("X-Debug", "from-call"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "abc"})))
        .mount(&server)
        .await;

    let pipeline = Arc::new(
        PipelineBuilder::new()
            .with_default_unauthenticated()
            .with_options(PipelineOptions {
                default_headers: std::collections::HashMap::from([("X-Debug".to_string(), "from-default".to_string())]),
                ..PipelineOptions::default()
            })
            .build(Arc::new(ReqwestTransport::default())),
    );

    let client = ApiClient::from_description(&spec_for(&server), pipeline, Arc::new(DefaultCodec)).unwrap();
    let args = CallArgs::new()
        .with("id", ArgValue::Text("abc".to_string()))
        .with("X-Debug", ArgValue::Text("from-call".to_string()));
    client.invoke("getItem", args).await.unwrap();
}

fn download_plan(server: &MockServer) -> MethodPlan {
    MethodPlan {
        operation_id: "downloadBlob".to_string(),
        verb: Verb::Get,
        url_template: format!("{}/blob", server.uri()),
        bindings: vec![],
        expected_status: std::collections::BTreeSet::from([200]),
        error: ErrorDescriptor {
            error_type: "DownloadBlobError".to_string(),
            error_body_type: None,
        },
        return_shape: ReturnShape::StreamOfChunks,
        response_wire_type: Some(BodyWireType::Stream),
        request_content_type: None,
    }
}

#[tokio::test]
async fn stream_of_chunks_transfers_the_raw_body_to_the_caller() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blob"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"chunked-payload".to_vec()))
        .mount(&server)
        .await;

    let registry = Arc::new(MethodPlanRegistry::from_plans(vec![download_plan(&server)]));
    let client = ApiClient::new(registry, unauthenticated_pipeline(), Arc::new(DefaultCodec));
    let result = client.invoke("downloadBlob", CallArgs::new()).await.unwrap();
    let InvocationResult::Stream { status, mut body } = result else {
        panic!("expected a Stream result")
    };
    assert_eq!(status, 200);

    let mut collected = Vec::new();
    while let Some(chunk) = body.next().await {
        collected.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(collected, b"chunked-payload");
}
