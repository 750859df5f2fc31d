// crates/github-mcp-contract/src/types.rs
// ============================================================================
// Module: Contract Types
// Description: Operation, toolset, route, and tool definition shapes.
// Purpose: Shared data model for the registry, the catalogue, and listings.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Registry entries are immutable once built. Every operation belongs to
//! exactly one toolset and declares how it is executed: either as a single
//! upstream REST call ([`ApiRoute`]) or as a discovery action handled by the
//! server itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Routes
// ============================================================================

/// HTTP method of an upstream REST call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl HttpMethod {
    /// Returns the method token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// Upstream REST route of an operation.
///
/// # Invariants
/// - `path` starts with `/` and names placeholders as `{name}`.
/// - Every placeholder is declared as a required parameter of the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApiRoute {
    /// HTTP method.
    pub method: HttpMethod,
    /// Path template relative to the API base URL.
    pub path: &'static str,
}

impl ApiRoute {
    /// Returns the placeholder names in template order.
    #[must_use]
    pub fn placeholders(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut rest = self.path;
        while let Some(start) = rest.find('{') {
            let after = &rest[start + 1 ..];
            let Some(end) = after.find('}') else {
                break;
            };
            names.push(&after[.. end]);
            rest = &after[end + 1 ..];
        }
        names
    }
}

/// Discovery actions served without an upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryAction {
    /// List every registered toolset and whether it is enabled.
    ListAvailableToolsets,
    /// List the operations of one toolset.
    GetToolsetTools,
    /// Enable a toolset at runtime.
    EnableToolset,
}

/// How an operation is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationTarget {
    /// Single upstream REST call.
    Api {
        /// Route to call.
        route: ApiRoute,
    },
    /// Server-side discovery action.
    Discovery {
        /// Action to run.
        action: DiscoveryAction,
    },
}

// ============================================================================
// SECTION: Parameters
// ============================================================================

/// JSON type of an operation parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// JSON string.
    String,
    /// JSON integer.
    Integer,
    /// JSON boolean.
    Boolean,
    /// JSON array of strings.
    StringArray,
}

/// Declared operation parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    /// Argument name.
    pub name: &'static str,
    /// Argument type.
    pub kind: ParamKind,
    /// Whether the argument must be present.
    pub required: bool,
    /// Human readable description.
    pub description: &'static str,
}

impl ParamSpec {
    /// Builds a required parameter.
    #[must_use]
    pub const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            description,
        }
    }

    /// Builds an optional parameter.
    #[must_use]
    pub const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            description,
        }
    }

    /// Returns the JSON schema fragment for this parameter.
    fn schema(&self) -> Value {
        match self.kind {
            ParamKind::String => json!({ "type": "string", "description": self.description }),
            ParamKind::Integer => json!({ "type": "integer", "description": self.description }),
            ParamKind::Boolean => json!({ "type": "boolean", "description": self.description }),
            ParamKind::StringArray => json!({
                "type": "array",
                "items": { "type": "string" },
                "description": self.description
            }),
        }
    }
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Registered operation.
///
/// # Invariants
/// - `name` is unique across the whole registry.
/// - `set_name` is the canonical (normalized) name of the owning toolset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationDescriptor {
    /// Tool name exposed to clients.
    pub name: &'static str,
    /// Tool description exposed to clients.
    pub description: &'static str,
    /// True when the operation changes upstream state.
    pub mutating: bool,
    /// Owning toolset.
    pub set_name: &'static str,
    /// Execution target.
    pub target: OperationTarget,
    /// Declared parameters.
    pub params: Vec<ParamSpec>,
}

impl OperationDescriptor {
    /// Returns the upstream route, if this operation has one.
    #[must_use]
    pub const fn route(&self) -> Option<ApiRoute> {
        match self.target {
            OperationTarget::Api {
                route,
            } => Some(route),
            OperationTarget::Discovery {
                ..
            } => None,
        }
    }

    /// Looks up a declared parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|param| param.name == name)
    }

    /// Builds the JSON schema for the tool input.
    #[must_use]
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in &self.params {
            properties.insert(param.name.to_string(), param.schema());
            if param.required {
                required.push(Value::String(param.name.to_string()));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false
        })
    }

    /// Builds the tool definition advertised by `tools/list`.
    #[must_use]
    pub fn tool_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.to_string(),
            description: self.description.to_string(),
            input_schema: self.input_schema(),
            annotations: ToolAnnotations {
                read_only_hint: !self.mutating,
            },
        }
    }
}

/// Registered toolset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationSetSpec {
    /// Canonical toolset name.
    pub name: &'static str,
    /// Toolset description.
    pub description: &'static str,
    /// Operations in registration order.
    pub operations: Vec<OperationDescriptor>,
}

// ============================================================================
// SECTION: Tool Definitions
// ============================================================================

/// Tool hints advertised to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    /// True when the tool does not change upstream state.
    pub read_only_hint: bool,
}

/// Tool definition shape used by MCP tool listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// MCP tool name.
    pub name: String,
    /// Tool description for clients.
    pub description: String,
    /// JSON schema for tool input.
    pub input_schema: Value,
    /// Behaviour hints.
    pub annotations: ToolAnnotations,
}
