// crates/github-mcp-contract/src/lib.rs
// ============================================================================
// Module: GitHub MCP Contract
// Description: Static registry of toolsets and GitHub operations.
// Purpose: Define every tool the server can expose, with its upstream route.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The contract crate is declarative: it lists toolsets, their operations,
//! parameter declarations, and the REST route each operation maps to. It has
//! no runtime state. The server crate builds a gated view over it.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod registry;
pub mod types;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use registry::CONTEXT_SET;
pub use registry::DYNAMIC_SET;
pub use registry::context_set;
pub use registry::discovery_set;
pub use registry::normalize_set_name;
pub use registry::operation_registry;
pub use types::ApiRoute;
pub use types::DiscoveryAction;
pub use types::HttpMethod;
pub use types::OperationDescriptor;
pub use types::OperationSetSpec;
pub use types::OperationTarget;
pub use types::ParamKind;
pub use types::ParamSpec;
pub use types::ToolAnnotations;
pub use types::ToolDefinition;
