// crates/github-mcp-server/src/tools.rs
// ============================================================================
// Module: Tool Router
// Description: Tool dispatch over the gated catalogue.
// Purpose: Resolve the call credential, validate arguments, and run the
// operation upstream or as a discovery action.
// Dependencies: github-mcp-contract, percent-encoding, serde_json
// ============================================================================

//! ## Overview
//! [`ToolRouter`] is the protocol dispatcher. It looks every call up in the
//! current catalogue snapshot, so a disabled set or a mutating operation under
//! read-only mode is indistinguishable from a tool that does not exist. Sets
//! that configuration cannot gate (identity, and discovery in dynamic mode)
//! are held beside the catalogue and served regardless of the enabled list.
//!
//! The credential for an upstream call is read from the [`RequestContext`]
//! passed in by the transport. Only stdio calls, which carry no credential,
//! use the process-wide fallback identity. An HTTP call without a credential
//! fails; it never borrows the fallback.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use github_mcp_config::ServerTransport;
use github_mcp_contract::ApiRoute;
use github_mcp_contract::DiscoveryAction;
use github_mcp_contract::HttpMethod;
use github_mcp_contract::OperationDescriptor;
use github_mcp_contract::OperationSetSpec;
use github_mcp_contract::OperationTarget;
use github_mcp_contract::ParamKind;
use github_mcp_contract::ToolDefinition;
use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;
use percent_encoding::utf8_percent_encode;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::app_auth::AppAuthError;
use crate::app_auth::InstallationTokenSource;
use crate::audit::AuditSink;
use crate::audit::ToolCallEvent;
use crate::audit::ToolCallEventParams;
use crate::audit::ToolsetEvent;
use crate::auth::RequestContext;
use crate::catalogue::Catalogue;
use crate::catalogue::CatalogueError;
use crate::catalogue::EnableOutcome;
use crate::catalogue::SharedCatalogue;
use crate::github::ApiError;
use crate::github::ClientFactory;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Characters left unescaped in a path segment (RFC 3986 unreserved).
const PATH_SEGMENT: &AsciiSet =
    &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');
/// Placeholder allowed to span several path segments.
const MULTI_SEGMENT_PLACEHOLDER: &str = "path";
/// Argument naming the toolset for discovery actions.
const TOOLSET_ARG: &str = "toolset";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Tool routing errors.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool name is not in the active view.
    #[error("unknown tool")]
    UnknownTool,
    /// No credential is available for the call.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    /// Arguments do not match the declared parameters.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    /// Catalogue rejected a discovery action.
    #[error(transparent)]
    Catalogue(#[from] CatalogueError),
    /// Fallback identity could not produce a token.
    #[error(transparent)]
    Credential(#[from] AppAuthError),
    /// Upstream answered with an error status.
    #[error("upstream error {status}: {message}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Upstream message.
        message: String,
    },
    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
    /// Result serialization failed.
    #[error("serialization failure")]
    Serialization,
}

impl ToolError {
    /// Returns a stable label for audit events.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnknownTool => "unknown_tool",
            Self::Unauthenticated(_) => "unauthenticated",
            Self::InvalidParams(_) => "invalid_params",
            Self::Catalogue(_) => "catalogue",
            Self::Credential(_) => "credential",
            Self::Upstream {
                ..
            } => "upstream",
            Self::Internal(_) => "internal",
            Self::Serialization => "serialization",
        }
    }
}

impl From<ApiError> for ToolError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Status {
                status,
                message,
            } => Self::Upstream {
                status,
                message,
            },
            ApiError::Transport(message) | ApiError::Decode(message) => Self::Internal(message),
        }
    }
}

// ============================================================================
// SECTION: Fallback Identity
// ============================================================================

/// Process-wide identity used only by calls that carry no credential.
pub enum FallbackIdentity {
    /// No fallback configured (multi-tenant only).
    None,
    /// Static personal access token.
    Static(String),
    /// Auto-refreshing installation token.
    Installation(InstallationTokenSource),
}

impl FallbackIdentity {
    /// Returns the strategy label, if any.
    #[must_use]
    pub const fn label(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Static(_) => Some("static_token"),
            Self::Installation(_) => Some("derived_identity"),
        }
    }

    /// Returns a currently valid fallback credential.
    async fn credential(&self) -> Result<String, ToolError> {
        match self {
            Self::None => {
                Err(ToolError::Unauthenticated("no fallback identity configured".to_string()))
            }
            Self::Static(token) => Ok(token.clone()),
            Self::Installation(source) => Ok(source.current_token().await?),
        }
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Collaborators for a [`ToolRouter`].
pub struct ToolRouterConfig {
    /// Initial catalogue view.
    pub catalogue: Catalogue,
    /// Sets served outside the catalogue gate.
    pub ungated: Vec<OperationSetSpec>,
    /// Upstream client factory.
    pub clients: Arc<dyn ClientFactory>,
    /// Fallback identity for calls without a credential.
    pub fallback: FallbackIdentity,
    /// Audit sink.
    pub audit: Arc<dyn AuditSink>,
}

/// Tool dispatcher shared by all transports.
#[derive(Clone)]
pub struct ToolRouter {
    /// Shared router state.
    inner: Arc<RouterInner>,
}

/// Shared router state.
struct RouterInner {
    /// Current catalogue view.
    catalogue: SharedCatalogue,
    /// Sets served outside the catalogue gate.
    ungated: Vec<OperationSetSpec>,
    /// Upstream client factory.
    clients: Arc<dyn ClientFactory>,
    /// Fallback identity.
    fallback: FallbackIdentity,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
}

impl ToolRouter {
    /// Builds a router.
    #[must_use]
    pub fn new(config: ToolRouterConfig) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                catalogue: SharedCatalogue::new(config.catalogue),
                ungated: config.ungated,
                clients: config.clients,
                fallback: config.fallback,
                audit: config.audit,
            }),
        }
    }

    /// Returns the current catalogue view.
    #[must_use]
    pub fn catalogue(&self) -> Arc<Catalogue> {
        self.inner.catalogue.snapshot()
    }

    /// Returns the fallback identity strategy label.
    #[must_use]
    pub fn fallback_label(&self) -> Option<&'static str> {
        self.inner.fallback.label()
    }

    /// Lists tool definitions for the ungated sets and the active view.
    #[must_use]
    pub fn list_tools(&self, _context: &RequestContext) -> Vec<ToolDefinition> {
        active_tool_definitions(&self.catalogue(), &self.inner.ungated)
    }

    /// Handles a tool call by name with JSON arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when the tool is not active, the arguments are
    /// invalid, no credential is available, or the upstream call fails.
    pub async fn handle_tool_call(
        &self,
        context: &RequestContext,
        name: &str,
        arguments: Value,
    ) -> Result<Value, ToolError> {
        let result = self.dispatch(context, name, arguments).await;
        self.inner.audit.record_tool_call(&ToolCallEvent::new(ToolCallEventParams {
            request_id: context.request_id.clone(),
            transport: context.transport.as_str(),
            tool: name.to_string(),
            error_kind: result.as_ref().err().map(ToolError::kind),
        }));
        result
    }

    /// Resolves and runs one call.
    async fn dispatch(
        &self,
        context: &RequestContext,
        name: &str,
        arguments: Value,
    ) -> Result<Value, ToolError> {
        let catalogue = self.catalogue();
        let operation = catalogue
            .lookup(name)
            .or_else(|| {
                ungated_operations(&self.inner.ungated, catalogue.read_only())
                    .find(|op| op.name == name)
            })
            .ok_or(ToolError::UnknownTool)?;
        let arguments = validate_arguments(operation, arguments)?;
        match operation.target {
            OperationTarget::Api {
                route,
            } => self.call_api(context, route, arguments).await,
            OperationTarget::Discovery {
                action,
            } => self.run_discovery(&catalogue, action, &arguments),
        }
    }

    /// Runs an upstream call with the call's credential.
    async fn call_api(
        &self,
        context: &RequestContext,
        route: ApiRoute,
        arguments: Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let request = build_upstream_request(route, arguments)?;
        let credential = self.credential(context).await?;
        let client = self.inner.clients.make_client(&credential);
        let response =
            client.request(request.method, &request.path, &request.query, request.body).await?;
        Ok(response)
    }

    /// Resolves the credential for one call.
    async fn credential(&self, context: &RequestContext) -> Result<String, ToolError> {
        if let Some(credential) = &context.credential {
            return Ok(credential.as_str().to_string());
        }
        match context.transport {
            ServerTransport::Stdio => self.inner.fallback.credential().await,
            ServerTransport::Http => {
                Err(ToolError::Unauthenticated("request carries no credential".to_string()))
            }
        }
    }

    /// Runs a discovery action.
    fn run_discovery(
        &self,
        catalogue: &Catalogue,
        action: DiscoveryAction,
        arguments: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        match action {
            DiscoveryAction::ListAvailableToolsets => {
                Ok(json!({ "toolsets": catalogue.list_sets() }))
            }
            DiscoveryAction::GetToolsetTools => {
                let toolset = string_argument(arguments, TOOLSET_ARG)?;
                let tools: Vec<Value> = catalogue
                    .set_operations(toolset)?
                    .into_iter()
                    .map(|op| json!({ "name": op.name, "description": op.description }))
                    .collect();
                Ok(json!({ "toolset": toolset, "tools": tools }))
            }
            DiscoveryAction::EnableToolset => {
                let toolset = string_argument(arguments, TOOLSET_ARG)?;
                self.enable_toolset(toolset)
            }
        }
    }

    /// Enables a toolset in the shared view and audits the outcome.
    fn enable_toolset(&self, toolset: &str) -> Result<Value, ToolError> {
        let outcome = self.inner.catalogue.enable_set(toolset);
        let label = match &outcome {
            Ok(EnableOutcome::Enabled) => "enabled",
            Ok(EnableOutcome::AlreadyEnabled) => "already_enabled",
            Err(_) => "unknown",
        };
        self.inner.audit.record_toolset(&ToolsetEvent::new(toolset, label));
        let message = match outcome? {
            EnableOutcome::Enabled => format!("Toolset {toolset} enabled"),
            EnableOutcome::AlreadyEnabled => format!("Toolset {toolset} is already enabled"),
        };
        Ok(json!({ "toolset": toolset, "enabled": true, "message": message }))
    }
}

/// Lists tool definitions for `ungated` followed by the catalogue's active
/// view. The read-only flag applies to both.
#[must_use]
pub fn active_tool_definitions(
    catalogue: &Catalogue,
    ungated: &[OperationSetSpec],
) -> Vec<ToolDefinition> {
    ungated_operations(ungated, catalogue.read_only())
        .chain(catalogue.list_active())
        .map(OperationDescriptor::tool_definition)
        .collect()
}

/// Operations of the ungated sets visible under `read_only`.
fn ungated_operations(
    sets: &[OperationSetSpec],
    read_only: bool,
) -> impl Iterator<Item = &OperationDescriptor> {
    sets.iter().flat_map(|set| &set.operations).filter(move |op| !(read_only && op.mutating))
}

// ============================================================================
// SECTION: Argument Handling
// ============================================================================

/// Upstream call derived from a route and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Percent-encoded path relative to the API base.
    pub path: String,
    /// Query pairs (GET only).
    pub query: Vec<(String, String)>,
    /// JSON body (non-GET only, omitted when empty).
    pub body: Option<Value>,
}

/// Checks arguments against the declared parameters.
///
/// `null` arguments and `null` values count as absent.
fn validate_arguments(
    operation: &OperationDescriptor,
    arguments: Value,
) -> Result<Map<String, Value>, ToolError> {
    let mut arguments = match arguments {
        Value::Null => Map::new(),
        Value::Object(map) => map,
        _ => return Err(ToolError::InvalidParams("arguments must be an object".to_string())),
    };
    arguments.retain(|_, value| !value.is_null());
    for key in arguments.keys() {
        if operation.param(key).is_none() {
            return Err(ToolError::InvalidParams(format!("unknown argument: {key}")));
        }
    }
    for param in &operation.params {
        match arguments.get(param.name) {
            None if param.required => {
                return Err(ToolError::InvalidParams(format!(
                    "missing required argument: {}",
                    param.name
                )));
            }
            Some(value) if !matches_kind(param.kind, value) => {
                return Err(ToolError::InvalidParams(format!(
                    "argument {} has the wrong type",
                    param.name
                )));
            }
            _ => {}
        }
    }
    Ok(arguments)
}

/// Returns true when `value` has the JSON type declared by `kind`.
fn matches_kind(kind: ParamKind, value: &Value) -> bool {
    match kind {
        ParamKind::String => value.is_string(),
        ParamKind::Integer => value.is_i64() || value.is_u64(),
        ParamKind::Boolean => value.is_boolean(),
        ParamKind::StringArray => {
            value.as_array().is_some_and(|items| items.iter().all(Value::is_string))
        }
    }
}

/// Builds the upstream call for `route`.
///
/// Placeholders consume their arguments; remaining arguments become the query
/// string for `GET` and the JSON body otherwise.
///
/// # Errors
///
/// Returns [`ToolError::InvalidParams`] when a placeholder argument is missing
/// or would escape its path segment.
pub fn build_upstream_request(
    route: ApiRoute,
    mut arguments: Map<String, Value>,
) -> Result<UpstreamRequest, ToolError> {
    let mut path = String::with_capacity(route.path.len());
    let mut rest = route.path;
    while let Some(start) = rest.find('{') {
        path.push_str(&rest[.. start]);
        let after = &rest[start + 1 ..];
        let end = after
            .find('}')
            .ok_or_else(|| ToolError::Internal(format!("malformed route: {}", route.path)))?;
        let name = &after[.. end];
        let value = arguments
            .remove(name)
            .ok_or_else(|| ToolError::InvalidParams(format!("missing required argument: {name}")))?;
        path.push_str(&encode_placeholder(name, &value)?);
        rest = &after[end + 1 ..];
    }
    path.push_str(rest);

    let (query, body) = if route.method == HttpMethod::Get {
        let query =
            arguments.iter().map(|(key, value)| (key.clone(), query_value(value))).collect();
        (query, None)
    } else if arguments.is_empty() {
        (Vec::new(), None)
    } else {
        (Vec::new(), Some(Value::Object(arguments)))
    };
    Ok(UpstreamRequest {
        method: route.method,
        path,
        query,
        body,
    })
}

/// Renders and percent-encodes one placeholder value.
fn encode_placeholder(name: &str, value: &Value) -> Result<String, ToolError> {
    let raw = match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        _ => {
            return Err(ToolError::InvalidParams(format!(
                "argument {name} must be a string or integer"
            )));
        }
    };
    if name == MULTI_SEGMENT_PLACEHOLDER {
        let segments: Vec<&str> = raw.trim_start_matches('/').split('/').collect();
        if segments.iter().any(|segment| *segment == "..") {
            return Err(ToolError::InvalidParams(format!("argument {name} must not contain ..")));
        }
        return Ok(segments
            .iter()
            .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
            .collect::<Vec<_>>()
            .join("/"));
    }
    if raw.is_empty() || raw == "." || raw == ".." {
        return Err(ToolError::InvalidParams(format!(
            "argument {name} is not a valid path segment"
        )));
    }
    Ok(utf8_percent_encode(&raw, PATH_SEGMENT).to_string())
}

/// Renders a query value; arrays are comma joined.
fn query_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items.iter().map(query_value).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// Reads a required string argument.
fn string_argument<'a>(
    arguments: &'a Map<String, Value>,
    name: &str,
) -> Result<&'a str, ToolError> {
    arguments
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidParams(format!("missing required argument: {name}")))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
