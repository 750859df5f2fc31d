// crates/github-mcp-server/src/lib.rs
// ============================================================================
// Module: GitHub MCP Server
// Description: Multi-tenant MCP server in front of the GitHub REST API.
// Purpose: Resolve identities per request and gate the operation catalogue.
// Dependencies: github-mcp-config, github-mcp-contract, axum, tokio, reqwest
// ============================================================================

//! ## Overview
//! One long-running process serves many callers, each under its own GitHub
//! identity. HTTP requests carry their own bearer credential, bound to the
//! request by [`auth::require_tenant_token`]; stdio calls use the process-wide
//! fallback identity, either a static token or an auto-refreshing
//! installation token from [`app_auth::InstallationTokenSource`]. Every call
//! is looked up in the gated [`catalogue::Catalogue`] before it reaches
//! GitHub.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod app_auth;
pub mod audit;
pub mod auth;
pub mod catalogue;
pub mod github;
pub mod server;
pub mod tools;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use app_auth::AppAuthError;
pub use app_auth::Clock;
pub use app_auth::InstallationToken;
pub use app_auth::InstallationTokenMinter;
pub use app_auth::InstallationTokenSource;
pub use app_auth::SystemClock;
pub use app_auth::TokenSourceConfig;
pub use audit::AuditSink;
pub use audit::MemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use auth::RequestContext;
pub use auth::RequestCredential;
pub use auth::TenantAuth;
pub use auth::extract_bearer_token;
pub use catalogue::Catalogue;
pub use catalogue::CatalogueError;
pub use catalogue::EnableOutcome;
pub use catalogue::SharedCatalogue;
pub use github::ApiError;
pub use github::ClientFactory;
pub use github::GithubApi;
pub use github::ReqwestClientFactory;
pub use server::McpServer;
pub use server::McpServerError;
pub use server::build_http_router;
pub use server::catalogue_from_config;
pub use server::serve_lines;
pub use server::ungated_sets;
pub use tools::FallbackIdentity;
pub use tools::ToolError;
pub use tools::ToolRouter;
pub use tools::ToolRouterConfig;
pub use tools::active_tool_definitions;
