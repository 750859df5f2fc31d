//! Tenant context injector tests for github-mcp-server.
// crates/github-mcp-server/tests/tenant_injector.rs
// ============================================================================
// Module: Tenant Injector Tests
// Description: HTTP credential middleware behaviour with a spy handler.
// Purpose: Ensure requests without a credential never reach dispatch and
// concurrent tenants never observe each other's credential.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions use unwrap for clarity."
)]

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use axum::Extension;
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_TYPE;
use axum::routing::get;
use github_mcp_server::MemoryAuditSink;
use github_mcp_server::RequestCredential;
use github_mcp_server::TenantAuth;
use github_mcp_server::audit::fingerprint;
use github_mcp_server::auth::MISSING_TOKEN_MESSAGE;
use http_body_util::BodyExt;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::Value;
use tower::ServiceExt;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Spy handler: counts invocations and echoes the credential it observed.
async fn spy(
    State(hits): State<Arc<AtomicUsize>>,
    Extension(credential): Extension<RequestCredential>,
) -> String {
    hits.fetch_add(1, Ordering::SeqCst);
    tokio::task::yield_now().await;
    credential.as_str().to_string()
}

fn protected_spy(audit: Arc<MemoryAuditSink>) -> (Router, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let inner = Router::new().route("/spy", get(spy)).with_state(Arc::clone(&hits));
    let router = TenantAuth::new(10, audit).protect(inner);
    (router, hits)
}

fn request(authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/spy");
    if let Some(value) = authorization {
        builder = builder.header(AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

// ============================================================================
// SECTION: Rejection
// ============================================================================

#[tokio::test]
async fn missing_header_is_rejected_without_calling_inner() {
    let audit = Arc::new(MemoryAuditSink::new());
    let (router, hits) = protected_spy(Arc::clone(&audit));

    let response = router.oneshot(request(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/json");
    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body, serde_json::json!({ "error": MISSING_TOKEN_MESSAGE }));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    let events = audit.events_named("tenant_auth");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["decision"], "deny");
}

#[tokio::test]
async fn malformed_headers_are_rejected_without_calling_inner() {
    let audit = Arc::new(MemoryAuditSink::new());
    let (router, hits) = protected_spy(audit);
    for header in [
        "bearer test_token_123456",
        "BEARER test_token_123456",
        "Token test_token_123456",
        "Bearer short",
        "Bearer ",
        "Bearertest_token_123456",
    ] {
        let response = router.clone().oneshot(request(Some(header))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "header {header}");
    }
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

// ============================================================================
// SECTION: Injection
// ============================================================================

#[tokio::test]
async fn valid_token_reaches_inner_with_exact_credential() {
    let audit = Arc::new(MemoryAuditSink::new());
    let (router, hits) = protected_spy(Arc::clone(&audit));

    let response = router.oneshot(request(Some("Bearer test_token_123456"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"test_token_123456");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    let events = audit.events_named("tenant_auth");
    assert_eq!(events[0]["decision"], "allow");
    assert_eq!(events[0]["token_fingerprint"], fingerprint("test_token_123456"));
    let logged = serde_json::to_string(&audit.events()).unwrap();
    assert!(!logged.contains("test_token_123456"));
}

#[tokio::test]
async fn token_with_internal_space_is_taken_verbatim() {
    let audit = Arc::new(MemoryAuditSink::new());
    let (router, _) = protected_spy(audit);
    let response = router.oneshot(request(Some("Bearer ghp_123 456789"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"ghp_123 456789");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_tenants_observe_only_their_own_token() {
    let audit = Arc::new(MemoryAuditSink::new());
    let (router, hits) = protected_spy(audit);
    let tokens: Vec<String> = (0 .. 64)
        .map(|_| {
            let len = rand::thread_rng().gen_range(16 .. 48);
            rand::thread_rng().sample_iter(&Alphanumeric).take(len).map(char::from).collect()
        })
        .collect();

    let tasks: Vec<_> = tokens
        .iter()
        .cloned()
        .map(|token| {
            let router = router.clone();
            tokio::spawn(async move {
                let header = format!("Bearer {token}");
                let response = router.oneshot(request(Some(&header))).await.unwrap();
                assert_eq!(response.status(), StatusCode::OK);
                (token, body_bytes(response).await)
            })
        })
        .collect();

    for task in tasks {
        let (token, observed) = task.await.unwrap();
        assert_eq!(observed, token.as_bytes());
    }
    assert_eq!(hits.load(Ordering::SeqCst), tokens.len());
}
