// crates/github-mcp-server/src/auth.rs
// ============================================================================
// Module: Tenant Authentication
// Description: Per-request bearer credential extraction and injection.
// Purpose: Bind each HTTP request to its own caller credential, fail closed.
// Dependencies: axum, serde_json
// ============================================================================

//! ## Overview
//! In multi-tenant (HTTP) mode every request must carry
//! `Authorization: Bearer <token>`. [`extract_bearer_token`] applies the strict
//! header grammar and [`require_tenant_token`] is the axum middleware that
//! rejects requests without a usable credential and otherwise attaches a
//! [`RequestCredential`] to that request's extensions.
//!
//! ## Invariants
//! - The credential lives only in the request it arrived with; nothing here
//!   writes shared state.
//! - Rejected requests never reach the inner handler.
//! - Credentials are never logged; audit events carry a SHA-256 fingerprint.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::Request;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::middleware;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use github_mcp_config::ServerTransport;
use serde_json::json;

use crate::audit::AuditSink;
use crate::audit::TenantAuthEvent;
use crate::audit::fingerprint;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Upper bound on the accepted `Authorization` header size.
pub const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;
/// Body of the 401 response for requests without a credential.
pub const MISSING_TOKEN_MESSAGE: &str = "missing GitHub token in Authorization header";
/// Exact, case-sensitive scheme prefix.
const BEARER_PREFIX: &str = "Bearer ";

// ============================================================================
// SECTION: Token Extraction
// ============================================================================

/// Extracts the bearer credential from an `Authorization` header value.
///
/// Returns an empty string when the header is absent, oversized, not in the
/// exact `Bearer <token>` form, or when the token is shorter than
/// `min_token_length` bytes. Everything after the single separating space is
/// taken verbatim, including internal spaces.
///
/// The whole header, scheme included, is capped at [`MAX_AUTH_HEADER_BYTES`].
/// A well-formed header over the cap is treated as absent, so a token round
/// trips through `Bearer <token>` only while the header stays within it.
#[must_use]
pub fn extract_bearer_token(header: Option<&str>, min_token_length: usize) -> String {
    let Some(header) = header else {
        return String::new();
    };
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return String::new();
    }
    match header.strip_prefix(BEARER_PREFIX) {
        Some(token) if !token.is_empty() && token.len() >= min_token_length => token.to_string(),
        _ => String::new(),
    }
}

// ============================================================================
// SECTION: Request Credential
// ============================================================================

/// Caller credential bound to a single request.
#[derive(Clone, PartialEq, Eq)]
pub struct RequestCredential(String);

impl RequestCredential {
    /// Wraps a credential string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw credential.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the SHA-256 fingerprint used in audit events.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.0)
    }
}

impl fmt::Debug for RequestCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RequestCredential(<redacted>)")
    }
}

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Per-request context passed explicitly through tool dispatch.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Transport used by the caller.
    pub transport: ServerTransport,
    /// Caller credential (HTTP only).
    pub credential: Option<RequestCredential>,
    /// Optional request identifier for auditing.
    pub request_id: Option<String>,
}

impl RequestContext {
    /// Builds a stdio request context.
    #[must_use]
    pub const fn stdio() -> Self {
        Self {
            transport: ServerTransport::Stdio,
            credential: None,
            request_id: None,
        }
    }

    /// Builds an HTTP request context carrying the caller credential.
    #[must_use]
    pub const fn http(credential: RequestCredential) -> Self {
        Self {
            transport: ServerTransport::Http,
            credential: Some(credential),
            request_id: None,
        }
    }

    /// Returns a copy with the request identifier set.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

// ============================================================================
// SECTION: Tenant Context Injector
// ============================================================================

/// State shared by the tenant middleware.
#[derive(Clone)]
pub struct TenantAuth {
    /// Minimum credential length.
    min_token_length: usize,
    /// Audit sink for allow/deny decisions.
    audit: Arc<dyn AuditSink>,
}

impl TenantAuth {
    /// Creates middleware state.
    #[must_use]
    pub fn new(min_token_length: usize, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            min_token_length,
            audit,
        }
    }

    /// Wraps `router` so every route requires a tenant credential.
    #[must_use]
    pub fn protect<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(middleware::from_fn_with_state(self, require_tenant_token))
    }
}

/// Axum middleware that requires a bearer credential on every request.
///
/// Requests without a usable credential get `401` with
/// `{"error": "missing GitHub token in Authorization header"}` and never reach
/// `next`. Otherwise the credential is inserted into the request extensions
/// and the inner response is returned unchanged.
pub async fn require_tenant_token(
    State(auth): State<TenantAuth>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request.headers().get(AUTHORIZATION).and_then(|value| value.to_str().ok());
    let token = extract_bearer_token(header, auth.min_token_length);
    if token.is_empty() {
        auth.audit.record_tenant_auth(&TenantAuthEvent::denied("missing_token"));
        return missing_token_response();
    }
    let credential = RequestCredential::new(token);
    auth.audit.record_tenant_auth(&TenantAuthEvent::allowed(credential.fingerprint()));
    request.extensions_mut().insert(credential);
    next.run(request).await
}

/// Builds the structured 401 response.
fn missing_token_response() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": MISSING_TOKEN_MESSAGE }))).into_response()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::use_debug, reason = "Test-only debug formatting.")]

    use super::*;

    const MIN: usize = 10;

    #[test]
    fn extracts_well_formed_token() {
        assert_eq!(
            extract_bearer_token(Some("Bearer ghp_1234567890abcdef"), MIN),
            "ghp_1234567890abcdef"
        );
    }

    #[test]
    fn scheme_is_case_sensitive() {
        assert_eq!(extract_bearer_token(Some("bearer ghp_1234567890abcdef"), MIN), "");
        assert_eq!(extract_bearer_token(Some("BEARER ghp_1234567890abcdef"), MIN), "");
    }

    #[test]
    fn rejects_short_and_empty_tokens() {
        assert_eq!(extract_bearer_token(Some("Bearer abc"), MIN), "");
        assert_eq!(extract_bearer_token(Some("Bearer "), MIN), "");
        assert_eq!(extract_bearer_token(Some("Bearer"), MIN), "");
        assert_eq!(extract_bearer_token(None, MIN), "");
    }

    #[test]
    fn keeps_internal_spaces_verbatim() {
        assert_eq!(extract_bearer_token(Some("Bearer ghp_123 456"), MIN), "ghp_123 456");
    }

    #[test]
    fn rejects_other_schemes() {
        assert_eq!(extract_bearer_token(Some("token ghp_1234567890abcdef"), MIN), "");
        assert_eq!(extract_bearer_token(Some("Basic dXNlcjpwYXNzd29yZA=="), MIN), "");
    }

    #[test]
    fn rejects_oversized_header() {
        let header = format!("Bearer {}", "a".repeat(MAX_AUTH_HEADER_BYTES));
        assert_eq!(extract_bearer_token(Some(&header), MIN), "");
    }

    #[test]
    fn credential_debug_is_redacted() {
        let credential = RequestCredential::new("ghp_supersecret");
        assert!(!format!("{credential:?}").contains("ghp_supersecret"));
        assert_eq!(credential.fingerprint().len(), 64);
    }
}
