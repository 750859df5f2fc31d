// crates/github-mcp-server/src/audit.rs
// ============================================================================
// Module: Audit Logging
// Description: Structured audit events for tenant auth, token minting, and
// tool dispatch.
// Purpose: Emit redacted JSON-line audit logs without a logging framework.
// Dependencies: serde, serde_json, sha2
// ============================================================================

//! ## Overview
//! Every security-relevant decision in the server is recorded through an
//! [`AuditSink`]. Events never carry credentials: per-request bearer tokens
//! appear only as a SHA-256 fingerprint, and minted installation tokens never
//! appear at all.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Tenant authentication decision for one HTTP request.
#[derive(Debug, Clone, Serialize)]
pub struct TenantAuthEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// `allow` or `deny`.
    pub decision: &'static str,
    /// Credential fingerprint (sha256) on allow.
    pub token_fingerprint: Option<String>,
    /// Denial reason.
    pub reason: Option<&'static str>,
}

impl TenantAuthEvent {
    /// Builds an allow event for a credential fingerprint.
    #[must_use]
    pub fn allowed(token_fingerprint: String) -> Self {
        Self {
            event: "tenant_auth",
            timestamp_ms: now_ms(),
            decision: "allow",
            token_fingerprint: Some(token_fingerprint),
            reason: None,
        }
    }

    /// Builds a deny event.
    #[must_use]
    pub fn denied(reason: &'static str) -> Self {
        Self {
            event: "tenant_auth",
            timestamp_ms: now_ms(),
            decision: "deny",
            token_fingerprint: None,
            reason: Some(reason),
        }
    }
}

/// Outcome of one installation token mint.
#[derive(Debug, Clone, Serialize)]
pub struct TokenMintEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Installation the token was minted for.
    pub installation_id: u64,
    /// `ok` or `failed`.
    pub outcome: &'static str,
    /// Expiry declared by the upstream (RFC 3339) on success.
    pub expires_at: Option<String>,
    /// Failure cause.
    pub cause: Option<String>,
    /// True when an unexpired cached token keeps serving after a failure.
    pub serving_cached: bool,
}

impl TokenMintEvent {
    /// Builds a success event.
    #[must_use]
    pub fn minted(installation_id: u64, expires_at: String) -> Self {
        Self {
            event: "token_mint",
            timestamp_ms: now_ms(),
            installation_id,
            outcome: "ok",
            expires_at: Some(expires_at),
            cause: None,
            serving_cached: false,
        }
    }

    /// Builds a failure event.
    #[must_use]
    pub fn failed(installation_id: u64, cause: String, serving_cached: bool) -> Self {
        Self {
            event: "token_mint",
            timestamp_ms: now_ms(),
            installation_id,
            outcome: "failed",
            expires_at: None,
            cause: Some(cause),
            serving_cached,
        }
    }
}

/// Runtime toolset enablement.
#[derive(Debug, Clone, Serialize)]
pub struct ToolsetEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Requested toolset name.
    pub toolset: String,
    /// `enabled`, `already_enabled`, or `unknown`.
    pub outcome: &'static str,
}

impl ToolsetEvent {
    /// Builds a toolset event.
    #[must_use]
    pub fn new(toolset: impl Into<String>, outcome: &'static str) -> Self {
        Self {
            event: "toolset_enabled",
            timestamp_ms: now_ms(),
            toolset: toolset.into(),
            outcome,
        }
    }
}

/// Tool dispatch record.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Request identifier when provided.
    pub request_id: Option<String>,
    /// Transport label.
    pub transport: &'static str,
    /// Tool name as requested.
    pub tool: String,
    /// `ok` or `error`.
    pub outcome: &'static str,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
}

/// Inputs required to construct a tool call event.
pub struct ToolCallEventParams {
    /// Request identifier when provided.
    pub request_id: Option<String>,
    /// Transport label.
    pub transport: &'static str,
    /// Tool name as requested.
    pub tool: String,
    /// Normalized error kind label, `None` on success.
    pub error_kind: Option<&'static str>,
}

impl ToolCallEvent {
    /// Creates a tool call event with a consistent timestamp.
    #[must_use]
    pub fn new(params: ToolCallEventParams) -> Self {
        Self {
            event: "tool_call",
            timestamp_ms: now_ms(),
            request_id: params.request_id,
            transport: params.transport,
            tool: params.tool,
            outcome: if params.error_kind.is_some() { "error" } else { "ok" },
            error_kind: params.error_kind,
        }
    }
}

/// Startup posture notice.
#[derive(Debug, Clone, Serialize)]
pub struct StartupEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Transport label.
    pub transport: &'static str,
    /// Fallback identity strategy label, if any.
    pub fallback_identity: Option<&'static str>,
    /// Whether mutating tools are hidden.
    pub read_only: bool,
    /// Whether discovery tools are exposed.
    pub dynamic_toolsets: bool,
    /// Optional warning.
    pub warning: Option<String>,
}

impl StartupEvent {
    /// Creates a startup event with a consistent timestamp.
    #[must_use]
    pub fn new(
        transport: &'static str,
        fallback_identity: Option<&'static str>,
        read_only: bool,
        dynamic_toolsets: bool,
        warning: Option<String>,
    ) -> Self {
        Self {
            event: "startup",
            timestamp_ms: now_ms(),
            transport,
            fallback_identity,
            read_only,
            dynamic_toolsets,
            warning,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for server events.
pub trait AuditSink: Send + Sync {
    /// Record a tenant auth decision.
    fn record_tenant_auth(&self, event: &TenantAuthEvent);

    /// Record a token mint outcome.
    fn record_token_mint(&self, _event: &TokenMintEvent) {}

    /// Record a runtime toolset change.
    fn record_toolset(&self, _event: &ToolsetEvent) {}

    /// Record a tool dispatch.
    fn record_tool_call(&self, _event: &ToolCallEvent) {}

    /// Record startup posture.
    fn record_startup(&self, _event: &StartupEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl StderrAuditSink {
    /// Writes one JSON line.
    fn emit(event: &impl Serialize) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

impl AuditSink for StderrAuditSink {
    fn record_tenant_auth(&self, event: &TenantAuthEvent) {
        Self::emit(event);
    }

    fn record_token_mint(&self, event: &TokenMintEvent) {
        Self::emit(event);
    }

    fn record_toolset(&self, event: &ToolsetEvent) {
        Self::emit(event);
    }

    fn record_tool_call(&self, event: &ToolCallEvent) {
        Self::emit(event);
    }

    fn record_startup(&self, event: &StartupEvent) {
        Self::emit(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record_tenant_auth(&self, _event: &TenantAuthEvent) {}
}

/// Audit sink that keeps serialized events in memory.
#[derive(Default)]
pub struct MemoryAuditSink {
    /// Recorded events in arrival order.
    events: Mutex<Vec<Value>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<Value> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns recorded events with the given `event` identifier.
    #[must_use]
    pub fn events_named(&self, name: &str) -> Vec<Value> {
        self.events().into_iter().filter(|event| event["event"] == name).collect()
    }

    /// Stores one event.
    fn push(&self, event: &impl Serialize) {
        if let Ok(value) = serde_json::to_value(event) {
            self.events.lock().unwrap_or_else(PoisonError::into_inner).push(value);
        }
    }
}

impl AuditSink for MemoryAuditSink {
    fn record_tenant_auth(&self, event: &TenantAuthEvent) {
        self.push(event);
    }

    fn record_token_mint(&self, event: &TokenMintEvent) {
        self.push(event);
    }

    fn record_toolset(&self, event: &ToolsetEvent) {
        self.push(event);
    }

    fn record_tool_call(&self, event: &ToolCallEvent) {
        self.push(event);
    }

    fn record_startup(&self, event: &StartupEvent) {
        self.push(event);
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the hex SHA-256 fingerprint of a secret.
#[must_use]
pub fn fingerprint(secret: &str) -> String {
    Sha256::digest(secret.as_bytes()).iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Milliseconds since the Unix epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn fingerprint_is_stable_sha256_hex() {
        assert_eq!(
            fingerprint("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn memory_sink_filters_by_event_name() {
        let sink = MemoryAuditSink::new();
        sink.record_tenant_auth(&TenantAuthEvent::denied("missing_token"));
        sink.record_toolset(&ToolsetEvent::new("repos", "enabled"));
        assert_eq!(sink.events().len(), 2);
        let denied = sink.events_named("tenant_auth");
        assert_eq!(denied.len(), 1);
        assert_eq!(denied[0]["decision"], "deny");
    }

    #[test]
    fn tool_call_outcome_follows_error_kind() {
        let ok = ToolCallEvent::new(ToolCallEventParams {
            request_id: None,
            transport: "stdio",
            tool: "get_me".to_string(),
            error_kind: None,
        });
        assert_eq!(ok.outcome, "ok");
        let failed = ToolCallEvent::new(ToolCallEventParams {
            request_id: Some("1".to_string()),
            transport: "http",
            tool: "get_me".to_string(),
            error_kind: Some("upstream"),
        });
        assert_eq!(failed.outcome, "error");
    }
}
