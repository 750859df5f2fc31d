// crates/github-mcp-config/src/lib.rs
// ============================================================================
// Module: GitHub MCP Config
// Description: Canonical configuration model for the GitHub MCP server.
// Purpose: Load, overlay, and validate startup configuration.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! This crate owns the configuration surface of the server: the credential
//! descriptor and its strategy resolver, transport settings, toolset
//! enablement, and upstream API settings. Every value is validated before the
//! server starts; startup errors are fatal.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod credentials;
pub mod error;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ALL_TOOLSETS;
pub use config::GithubApiConfig;
pub use config::GithubMcpConfig;
pub use config::ServerConfig;
pub use config::ServerTransport;
pub use config::ToolsetConfig;
pub use credentials::AuthStrategy;
pub use credentials::CredentialDescriptor;
pub use credentials::resolve_auth_strategy;
pub use error::ConfigError;
