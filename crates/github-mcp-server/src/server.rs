// crates/github-mcp-server/src/server.rs
// ============================================================================
// Module: MCP Server
// Description: MCP server over stdio and multi-tenant HTTP.
// Purpose: Expose the gated GitHub catalogue via JSON-RPC 2.0.
// Dependencies: axum, tokio, github-mcp-config
// ============================================================================

//! ## Overview
//! The MCP server speaks JSON-RPC 2.0 and always routes calls through
//! [`crate::tools::ToolRouter`].
//!
//! - Stdio: newline-delimited messages, single tenant. Calls carry no
//!   credential and use the fallback identity.
//! - HTTP: `POST /mcp` behind [`crate::auth::require_tenant_token`]. The
//!   credential travels from the middleware in request extensions into an
//!   explicit [`RequestContext`] and is dropped with the request.
//!
//! Security posture: request bodies are untrusted, size-capped, and parsed
//! into closed types before dispatch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Extension;
use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::post;
use github_mcp_config::AuthStrategy;
use github_mcp_config::GithubMcpConfig;
use github_mcp_config::ServerTransport;
use github_mcp_config::ToolsetConfig;
use github_mcp_contract::OperationSetSpec;
use github_mcp_contract::ToolDefinition;
use github_mcp_contract::context_set;
use github_mcp_contract::discovery_set;
use github_mcp_contract::operation_registry;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;

use crate::app_auth::GithubInstallationMinter;
use crate::app_auth::InstallationTokenSource;
use crate::app_auth::SystemClock;
use crate::app_auth::TokenSourceConfig;
use crate::audit::AuditSink;
use crate::audit::StartupEvent;
use crate::audit::StderrAuditSink;
use crate::auth::RequestContext;
use crate::auth::RequestCredential;
use crate::auth::TenantAuth;
use crate::catalogue::Catalogue;
use crate::catalogue::CatalogueError;
use crate::github::ReqwestClientFactory;
use crate::tools::FallbackIdentity;
use crate::tools::ToolError;
use crate::tools::ToolRouter;
use crate::tools::ToolRouterConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// HTTP route serving JSON-RPC.
pub const MCP_ROUTE: &str = "/mcp";
/// Protocol version answered when the client does not propose one.
const DEFAULT_PROTOCOL_VERSION: &str = "2025-03-26";
/// Server name reported by `initialize`.
const SERVER_NAME: &str = "github-mcp-server";

// ============================================================================
// SECTION: MCP Server
// ============================================================================

/// MCP server instance.
pub struct McpServer {
    /// Server configuration.
    config: GithubMcpConfig,
    /// Tool router for request dispatch.
    router: ToolRouter,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
}

impl McpServer {
    /// Builds a new MCP server from configuration.
    ///
    /// Credential and toolset errors are fatal: the server is not built.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when validation or initialization fails.
    pub fn from_config(config: GithubMcpConfig) -> Result<Self, McpServerError> {
        let audit: Arc<dyn AuditSink> = Arc::new(StderrAuditSink);
        Self::with_audit(config, audit)
    }

    /// Builds a new MCP server that records events to `audit`.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when validation or initialization fails.
    pub fn with_audit(
        config: GithubMcpConfig,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, McpServerError> {
        config.validate().map_err(|err| McpServerError::Config(err.to_string()))?;
        let fallback = build_fallback(&config, &audit)?;
        let catalogue = catalogue_from_config(&config.toolsets)
            .map_err(|err| McpServerError::Config(err.to_string()))?;
        let clients = ReqwestClientFactory::new(&config.github)
            .map_err(|err| McpServerError::Init(err.to_string()))?;
        let router = ToolRouter::new(ToolRouterConfig {
            catalogue,
            ungated: ungated_sets(&config.toolsets),
            clients: Arc::new(clients),
            fallback,
            audit: Arc::clone(&audit),
        });
        audit.record_startup(&StartupEvent::new(
            config.server.transport.as_str(),
            router.fallback_label(),
            config.toolsets.read_only,
            config.toolsets.dynamic,
            startup_warning(config.server.transport, router.fallback_label()),
        ));
        Ok(Self {
            config,
            router,
            audit,
        })
    }

    /// Returns the tool router.
    #[must_use]
    pub const fn router(&self) -> &ToolRouter {
        &self.router
    }

    /// Serves requests using the configured transport.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when the server fails.
    pub async fn serve(self) -> Result<(), McpServerError> {
        let max_body_bytes = self.config.server.max_body_bytes;
        match self.config.server.transport {
            ServerTransport::Stdio => {
                let reader = BufReader::new(tokio::io::stdin());
                serve_lines(&self.router, reader, tokio::io::stdout(), max_body_bytes).await
            }
            ServerTransport::Http => serve_http(self).await,
        }
    }
}

/// Builds the startup catalogue for a toolset configuration.
///
/// # Errors
///
/// Returns [`CatalogueError::UnknownSet`] for an unrecognized toolset name.
pub fn catalogue_from_config(toolsets: &ToolsetConfig) -> Result<Catalogue, CatalogueError> {
    Catalogue::build(operation_registry(), &toolsets.startup_sets(), toolsets.read_only)
}

/// Returns the sets served outside the catalogue gate: the identity set, plus
/// the discovery set in dynamic mode.
#[must_use]
pub fn ungated_sets(toolsets: &ToolsetConfig) -> Vec<OperationSetSpec> {
    let mut sets = vec![context_set()];
    if toolsets.dynamic {
        sets.push(discovery_set());
    }
    sets
}

/// Builds the fallback identity for the resolved strategy.
fn build_fallback(
    config: &GithubMcpConfig,
    audit: &Arc<dyn AuditSink>,
) -> Result<FallbackIdentity, McpServerError> {
    let strategy =
        config.fallback_strategy().map_err(|err| McpServerError::Config(err.to_string()))?;
    match strategy {
        None => Ok(FallbackIdentity::None),
        Some(AuthStrategy::StaticToken) => {
            let token = config.auth.token().ok_or_else(|| {
                McpServerError::Config("personal_access_token is blank".to_string())
            })?;
            Ok(FallbackIdentity::Static(token.to_string()))
        }
        Some(AuthStrategy::DerivedIdentity) => {
            let (app_id, installation_id, pem) = config.auth.derived_parts().ok_or_else(|| {
                McpServerError::Config("GitHub App credentials are incomplete".to_string())
            })?;
            let minter = GithubInstallationMinter::new(&config.github)
                .map_err(|err| McpServerError::Init(err.to_string()))?;
            let margin = i64::try_from(config.github.token_refresh_margin_secs).unwrap_or(i64::MAX);
            let source = InstallationTokenSource::new(
                app_id,
                installation_id,
                pem,
                TokenSourceConfig {
                    minter: Arc::new(minter),
                    clock: Arc::new(SystemClock),
                    refresh_margin: time::Duration::seconds(margin),
                    audit: Arc::clone(audit),
                },
            )
            .map_err(|err| McpServerError::Config(err.to_string()))?;
            Ok(FallbackIdentity::Installation(source))
        }
    }
}

/// Returns the startup warning for the transport and fallback posture.
fn startup_warning(transport: ServerTransport, fallback: Option<&'static str>) -> Option<String> {
    match (transport, fallback) {
        (ServerTransport::Http, None) => Some(
            "multi-tenant mode without a fallback identity; every request must carry its own \
             credential"
                .to_string(),
        ),
        (ServerTransport::Http, Some(_)) => Some(
            "fallback identity is configured but HTTP requests only use their own credential"
                .to_string(),
        ),
        (ServerTransport::Stdio, _) => None,
    }
}

// ============================================================================
// SECTION: Stdio Transport
// ============================================================================

/// Serves newline-delimited JSON-RPC over `reader` and `writer`.
///
/// Returns when `reader` reaches end of input.
///
/// # Errors
///
/// Returns [`McpServerError::Transport`] on I/O failure. A line longer than
/// `max_body_bytes` is discarded and answered with a JSON-RPC error; the
/// session continues with the next line.
pub async fn serve_lines<R, W>(
    router: &ToolRouter,
    mut reader: R,
    mut writer: W,
    max_body_bytes: usize,
) -> Result<(), McpServerError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    while let Some(line) = read_line(&mut reader, max_body_bytes).await? {
        let line = match line {
            StdioLine::Request(line) => line,
            StdioLine::Oversized => {
                let (_, response) = body_too_large();
                write_line(&mut writer, &response).await?;
                continue;
            }
        };
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let context = RequestContext::stdio();
        let Some((_, response)) = parse_request(router, &context, &line).await else {
            continue;
        };
        write_line(&mut writer, &response).await?;
    }
    Ok(())
}

/// One line read from the stdio stream.
enum StdioLine {
    /// Line within the size cap, without its terminator.
    Request(Vec<u8>),
    /// Line over the size cap; its bytes were discarded.
    Oversized,
}

/// Reads one line, enforcing the size cap. Returns `None` at end of input.
async fn read_line<R>(
    reader: &mut R,
    max_body_bytes: usize,
) -> Result<Option<StdioLine>, McpServerError>
where
    R: AsyncBufRead + Unpin,
{
    let limit = u64::try_from(max_body_bytes).unwrap_or(u64::MAX).saturating_add(1);
    let mut line = Vec::new();
    let read = (&mut *reader)
        .take(limit)
        .read_until(b'\n', &mut line)
        .await
        .map_err(|err| McpServerError::Transport(format!("stdin read failed: {err}")))?;
    if read == 0 {
        return Ok(None);
    }
    if line.last() == Some(&b'\n') {
        line.pop();
    } else if line.len() > max_body_bytes {
        discard_line(reader).await?;
    }
    if line.len() > max_body_bytes {
        return Ok(Some(StdioLine::Oversized));
    }
    Ok(Some(StdioLine::Request(line)))
}

/// Skips input up to and including the next newline, or to end of input.
async fn discard_line<R>(reader: &mut R) -> Result<(), McpServerError>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let buffer = reader
            .fill_buf()
            .await
            .map_err(|err| McpServerError::Transport(format!("stdin read failed: {err}")))?;
        if buffer.is_empty() {
            return Ok(());
        }
        let newline = buffer.iter().position(|byte| *byte == b'\n');
        let used = newline.map_or(buffer.len(), |index| index + 1);
        reader.consume(used);
        if newline.is_some() {
            return Ok(());
        }
    }
}

/// Writes one newline-terminated response and flushes.
async fn write_line<W>(writer: &mut W, response: &JsonRpcResponse) -> Result<(), McpServerError>
where
    W: AsyncWrite + Unpin,
{
    let mut payload = serde_json::to_vec(response)
        .map_err(|_| McpServerError::Transport("json-rpc serialization failed".to_string()))?;
    payload.push(b'\n');
    writer
        .write_all(&payload)
        .await
        .map_err(|err| McpServerError::Transport(format!("stdout write failed: {err}")))?;
    writer
        .flush()
        .await
        .map_err(|err| McpServerError::Transport(format!("stdout flush failed: {err}")))
}

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// Serves JSON-RPC requests over HTTP.
async fn serve_http(server: McpServer) -> Result<(), McpServerError> {
    let bind = server
        .config
        .server
        .bind
        .as_ref()
        .ok_or_else(|| McpServerError::Config("bind address required".to_string()))?;
    let addr: SocketAddr =
        bind.parse().map_err(|_| McpServerError::Config("invalid bind address".to_string()))?;
    let tenant = TenantAuth::new(server.config.server.min_token_length, Arc::clone(&server.audit));
    let app = build_http_router(server.router, server.config.server.max_body_bytes, tenant);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|_| McpServerError::Transport("http bind failed".to_string()))?;
    axum::serve(listener, app)
        .await
        .map_err(|_| McpServerError::Transport("http server failed".to_string()))
}

/// Builds the multi-tenant HTTP router.
///
/// Every route sits behind the tenant credential middleware.
#[must_use]
pub fn build_http_router(router: ToolRouter, max_body_bytes: usize, tenant: TenantAuth) -> Router {
    let state = Arc::new(HttpState {
        router,
        max_body_bytes,
    });
    let routes = Router::new()
        .route(MCP_ROUTE, post(handle_http))
        .layer(DefaultBodyLimit::max(max_body_bytes.saturating_add(1)))
        .with_state(state);
    tenant.protect(routes)
}

/// Shared state for HTTP handlers.
struct HttpState {
    /// Tool router for request dispatch.
    router: ToolRouter,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
}

/// Handles one HTTP JSON-RPC request for the tenant the middleware attached.
async fn handle_http(
    State(state): State<Arc<HttpState>>,
    Extension(credential): Extension<RequestCredential>,
    bytes: Bytes,
) -> Response {
    if bytes.len() > state.max_body_bytes {
        let (status, response) = body_too_large();
        return (status, Json(response)).into_response();
    }
    let context = RequestContext::http(credential);
    match parse_request(&state.router, &context, &bytes).await {
        Some((status, response)) => (status, Json(response)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

// ============================================================================
// SECTION: JSON-RPC Handling
// ============================================================================

/// Incoming JSON-RPC request payload.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    jsonrpc: String,
    /// Request identifier; absent for notifications.
    #[serde(default)]
    id: Option<Value>,
    /// Method name.
    method: String,
    /// Optional parameters payload.
    params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    jsonrpc: &'static str,
    /// Request identifier.
    id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error payload.
#[derive(Debug, Serialize)]
struct JsonRpcError {
    /// Error code.
    code: i64,
    /// Human-readable error message.
    message: String,
}

/// Tool call parameters for JSON-RPC requests.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Raw JSON arguments.
    #[serde(default)]
    arguments: Value,
}

/// Tool list response payload.
#[derive(Debug, Serialize)]
struct ToolListResult {
    /// Active tool definitions.
    tools: Vec<ToolDefinition>,
}

/// Tool call response payload.
#[derive(Debug, Serialize)]
struct ToolCallResult {
    /// Tool output content.
    content: Vec<ToolContent>,
}

/// Tool output payloads for JSON-RPC responses.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ToolContent {
    /// Text tool output carrying serialized JSON.
    Text {
        /// JSON payload rendered as text.
        text: String,
    },
}

/// Parses one message and dispatches it.
///
/// Returns `None` for notifications, which get no response.
async fn parse_request(
    router: &ToolRouter,
    context: &RequestContext,
    bytes: &[u8],
) -> Option<(StatusCode, JsonRpcResponse)> {
    let request: JsonRpcRequest = match serde_json::from_slice(bytes) {
        Ok(request) => request,
        Err(_) => {
            return Some(rpc_failure(
                StatusCode::BAD_REQUEST,
                Value::Null,
                -32700,
                "invalid json-rpc request".to_string(),
            ));
        }
    };
    let id = request.id.clone()?;
    Some(handle_request(router, context, id, request).await)
}

/// Dispatches a JSON-RPC request to the tool router.
async fn handle_request(
    router: &ToolRouter,
    base_context: &RequestContext,
    id: Value,
    request: JsonRpcRequest,
) -> (StatusCode, JsonRpcResponse) {
    if request.jsonrpc != "2.0" {
        return rpc_failure(
            StatusCode::BAD_REQUEST,
            id,
            -32600,
            "invalid json-rpc version".to_string(),
        );
    }
    let context = base_context.clone().with_request_id(id.to_string());
    match request.method.as_str() {
        "initialize" => rpc_success(id, initialize_result(request.params.as_ref())),
        "ping" => rpc_success(id, json!({})),
        "tools/list" => match serde_json::to_value(ToolListResult {
            tools: router.list_tools(&context),
        }) {
            Ok(value) => rpc_success(id, value),
            Err(_) => jsonrpc_error(id, ToolError::Serialization),
        },
        "tools/call" => {
            let params = request.params.unwrap_or(Value::Null);
            let Ok(call) = serde_json::from_value::<ToolCallParams>(params) else {
                return rpc_failure(
                    StatusCode::BAD_REQUEST,
                    id,
                    -32602,
                    "invalid tool params".to_string(),
                );
            };
            match router.handle_tool_call(&context, &call.name, call.arguments).await {
                Ok(result) => match tool_call_result(&result) {
                    Ok(value) => rpc_success(id, value),
                    Err(err) => jsonrpc_error(id, err),
                },
                Err(err) => jsonrpc_error(id, err),
            }
        }
        _ => rpc_failure(StatusCode::BAD_REQUEST, id, -32601, "method not found".to_string()),
    }
}

/// Builds the `initialize` result, echoing the client's protocol version.
fn initialize_result(params: Option<&Value>) -> Value {
    let version = params
        .and_then(|params| params.get("protocolVersion"))
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_PROTOCOL_VERSION);
    json!({
        "protocolVersion": version,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") }
    })
}

/// Wraps a tool result as MCP text content.
fn tool_call_result(result: &Value) -> Result<Value, ToolError> {
    let text = serde_json::to_string(result).map_err(|_| ToolError::Serialization)?;
    serde_json::to_value(ToolCallResult {
        content: vec![ToolContent::Text {
            text,
        }],
    })
    .map_err(|_| ToolError::Serialization)
}

/// Builds a successful response.
fn rpc_success(id: Value, result: Value) -> (StatusCode, JsonRpcResponse) {
    (
        StatusCode::OK,
        JsonRpcResponse {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        },
    )
}

/// Builds the error for a message over the size cap.
fn body_too_large() -> (StatusCode, JsonRpcResponse) {
    rpc_failure(
        StatusCode::PAYLOAD_TOO_LARGE,
        Value::Null,
        -32070,
        "request body too large".to_string(),
    )
}

/// Builds an error response.
fn rpc_failure(
    status: StatusCode,
    id: Value,
    code: i64,
    message: String,
) -> (StatusCode, JsonRpcResponse) {
    (
        status,
        JsonRpcResponse {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
            }),
        },
    )
}

/// Builds a JSON-RPC error response for a tool failure.
fn jsonrpc_error(id: Value, error: ToolError) -> (StatusCode, JsonRpcResponse) {
    let (status, code, message) = match error {
        ToolError::UnknownTool => (StatusCode::BAD_REQUEST, -32601, "unknown tool".to_string()),
        ToolError::Unauthenticated(_) => {
            (StatusCode::UNAUTHORIZED, -32001, "unauthenticated".to_string())
        }
        ToolError::InvalidParams(message) => (StatusCode::BAD_REQUEST, -32602, message),
        ToolError::Catalogue(err) => (StatusCode::OK, -32004, err.to_string()),
        ToolError::Credential(err) => (StatusCode::OK, -32010, err.to_string()),
        ToolError::Upstream {
            status,
            message,
        } => (StatusCode::OK, -32020, format!("github returned {status}: {message}")),
        ToolError::Internal(message) => (StatusCode::OK, -32050, message),
        ToolError::Serialization => (StatusCode::OK, -32060, "serialization failed".to_string()),
    };
    rpc_failure(status, id, code, message)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// MCP server errors.
#[derive(Debug, thiserror::Error)]
pub enum McpServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
