//! HTTP transport tests for github-mcp-server.
// crates/github-mcp-server/tests/http_transport.rs
// ============================================================================
// Module: HTTP Transport Tests
// Description: JSON-RPC over the tenant-protected HTTP router.
// Purpose: Exercise the full request path from header to upstream call.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions use unwrap for clarity."
)]

mod common;

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_TYPE;
use common::RecordingClientFactory;
use common::router_with;
use github_mcp_server::FallbackIdentity;
use github_mcp_server::MemoryAuditSink;
use github_mcp_server::TenantAuth;
use github_mcp_server::build_http_router;
use http_body_util::BodyExt;
use serde_json::Value;
use serde_json::json;
use tower::ServiceExt;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const MAX_BODY: usize = 4096;

struct Stack {
    app: Router,
    clients: Arc<RecordingClientFactory>,
    audit: Arc<MemoryAuditSink>,
}

fn stack(enabled: &[&str], dynamic: bool) -> Stack {
    let clients = RecordingClientFactory::new();
    let audit = Arc::new(MemoryAuditSink::new());
    let router = router_with(
        enabled,
        false,
        dynamic,
        FallbackIdentity::Static("ghp_fallback_token".to_string()),
        Arc::clone(&clients),
        Arc::clone(&audit),
    );
    let tenant = TenantAuth::new(10, Arc::clone(&audit) as _);
    Stack {
        app: build_http_router(router, MAX_BODY, tenant),
        clients,
        audit,
    }
}

fn post(token: Option<&str>, body: impl Into<Body>) -> Request<Body> {
    let mut builder =
        Request::builder().method("POST").uri("/mcp").header(CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(body.into()).unwrap()
}

fn rpc(id: u64, method: &str, params: Value) -> String {
    json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }).to_string()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, body)
}

fn content_json(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

// ============================================================================
// SECTION: Authentication
// ============================================================================

#[tokio::test]
async fn request_without_token_is_rejected_before_dispatch() {
    let stack = stack(&[], false);
    let (status, body) = send(&stack.app, post(None, rpc(1, "tools/list", json!({})))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
    assert!(stack.audit.events_named("tool_call").is_empty());
}

// ============================================================================
// SECTION: JSON-RPC Methods
// ============================================================================

#[tokio::test]
async fn initialize_echoes_protocol_version() {
    let stack = stack(&[], false);
    let request = post(
        Some("ghp_tenant_token"),
        rpc(1, "initialize", json!({ "protocolVersion": "2024-11-05" })),
    );
    let (status, body) = send(&stack.app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 1);
    assert_eq!(body["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(body["result"]["serverInfo"]["name"], "github-mcp-server");
}

#[tokio::test]
async fn tools_list_reflects_enabled_sets() {
    let stack = stack(&["issues"], false);
    let (status, body) =
        send(&stack.app, post(Some("ghp_tenant_token"), rpc(2, "tools/list", json!({})))).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|tool| tool["name"].as_str())
        .collect();
    assert!(names.contains(&"get_issue"));
    assert!(names.contains(&"get_me"));
    assert!(!names.contains(&"get_pull_request"));
    let first = &body["result"]["tools"][0];
    assert_eq!(first["inputSchema"]["type"], "object");
}

#[tokio::test]
async fn tools_call_runs_with_the_tenant_credential() {
    let stack = stack(&[], false);
    let request =
        post(Some("ghp_tenant_token"), rpc(3, "tools/call", json!({ "name": "get_me" })));
    let (status, body) = send(&stack.app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["content"][0]["type"], "text");
    let content = content_json(&body);
    assert_eq!(content["credential"], "ghp_tenant_token");
    assert_eq!(stack.clients.calls()[0].credential, "ghp_tenant_token");
}

#[tokio::test]
async fn unknown_tool_and_method_map_to_json_rpc_errors() {
    let stack = stack(&[], false);
    let token = Some("ghp_tenant_token");
    let (status, body) = send(
        &stack.app,
        post(token, rpc(4, "tools/call", json!({ "name": "create_issue", "arguments": {} }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], -32601);

    let (_, body) = send(&stack.app, post(token, rpc(5, "resources/list", json!({})))).await;
    assert_eq!(body["error"]["code"], -32601);
    assert_eq!(body["error"]["message"], "method not found");

    let missing_name = rpc(6, "tools/call", json!({ "arguments": {} }));
    let (status, body) = send(&stack.app, post(token, missing_name)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], -32602);
}

#[tokio::test]
async fn invalid_json_is_a_parse_error() {
    let stack = stack(&[], false);
    let (status, body) = send(&stack.app, post(Some("ghp_tenant_token"), "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], -32700);
    assert_eq!(body["id"], Value::Null);
}

#[tokio::test]
async fn notification_is_accepted_without_body() {
    let stack = stack(&[], false);
    let notification =
        json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }).to_string();
    let (status, body) = send(&stack.app, post(Some("ghp_tenant_token"), notification)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, json!(""));
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let stack = stack(&[], false);
    let padding = "x".repeat(MAX_BODY);
    let body = rpc(7, "tools/list", json!({ "padding": padding }));
    let (status, _) = send(&stack.app, post(Some("ghp_tenant_token"), body)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn enable_toolset_over_http_is_visible_to_other_tenants() {
    let stack = stack(&[], true);
    let enable = rpc(
        8,
        "tools/call",
        json!({ "name": "enable_toolset", "arguments": { "toolset": "issues" } }),
    );
    let (status, body) = send(&stack.app, post(Some("ghp_tenant_a_token"), enable)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_json(&body)["enabled"], true);

    let call = rpc(
        9,
        "tools/call",
        json!({
            "name": "get_issue",
            "arguments": { "owner": "o", "repo": "r", "issue_number": 1 }
        }),
    );
    let (status, body) = send(&stack.app, post(Some("ghp_tenant_b_token"), call)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_json(&body)["credential"], "ghp_tenant_b_token");
}

// ============================================================================
// SECTION: Isolation
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_tenants_reach_upstream_with_their_own_credential() {
    let stack = stack(&[], false);
    let tasks: Vec<_> = (0 .. 48)
        .map(|index| {
            let app = stack.app.clone();
            tokio::spawn(async move {
                let token = format!("ghp_tenant_{index:04}_token");
                let call = rpc(index, "tools/call", json!({ "name": "get_me" }));
                let request = post(Some(token.as_str()), call);
                let (status, body) = send(&app, request).await;
                assert_eq!(status, StatusCode::OK);
                (token, index, body)
            })
        })
        .collect();
    for task in tasks {
        let (token, index, body) = task.await.unwrap();
        assert_eq!(body["id"], index);
        assert_eq!(content_json(&body)["credential"], token.as_str());
    }
    let calls = stack.clients.calls();
    assert_eq!(calls.len(), 48);
    assert!(calls.iter().all(|call| call.credential != "ghp_fallback_token"));
}
