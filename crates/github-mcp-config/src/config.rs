// crates/github-mcp-config/src/config.rs
// ============================================================================
// Module: Server Configuration
// Description: Configuration model, loading, environment overlay, validation.
// Purpose: Provide a single typed source of truth for server startup.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! [`GithubMcpConfig`] is loaded from an optional TOML file and then overlaid
//! with `GITHUB_*` environment settings. The environment lookup is injected so
//! callers (and tests) control where values come from. [`GithubMcpConfig::validate`]
//! is the fail-closed gate run before the server starts.
//!
//! ## Invariants
//! - Stdio mode always resolves a fallback identity.
//! - HTTP mode may run without a fallback identity, but a partially configured
//!   one is still rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Read;
use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::credentials::AuthStrategy;
use crate::credentials::CredentialDescriptor;
use crate::credentials::resolve_auth_strategy;
use crate::error::ConfigError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default GitHub REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";
/// Default user agent for upstream calls.
pub const DEFAULT_USER_AGENT: &str = "github-mcp-server";
/// Keyword enabling every registered toolset.
pub const ALL_TOOLSETS: &str = "all";
/// Default maximum JSON-RPC body size.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Default minimum accepted length for per-request credentials.
pub const DEFAULT_MIN_TOKEN_LENGTH: usize = 10;
/// Default upstream request timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Default safety margin before installation token expiry.
pub const DEFAULT_TOKEN_REFRESH_MARGIN_SECS: u64 = 60;

/// Maximum config file size accepted by [`GithubMcpConfig::load`].
const MAX_CONFIG_FILE_BYTES: u64 = 1024 * 1024;
/// Upper bound for `server.max_body_bytes`.
const MAX_BODY_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Upper bound for `server.min_token_length`.
const MAX_MIN_TOKEN_LENGTH: usize = 256;
/// Maximum number of configured toolset names.
const MAX_TOOLSET_NAMES: usize = 64;
/// Maximum length of a configured toolset name.
const MAX_TOOLSET_NAME_LENGTH: usize = 64;
/// Upper bound for the refresh safety margin (installation tokens live 1h).
const MAX_TOKEN_REFRESH_MARGIN_SECS: u64 = 30 * 60;

/// Environment variable carrying the static token.
pub const ENV_PERSONAL_ACCESS_TOKEN: &str = "GITHUB_PERSONAL_ACCESS_TOKEN";
/// Environment variable carrying the GitHub App identifier.
pub const ENV_APP_ID: &str = "GITHUB_APP_ID";
/// Environment variable carrying the installation identifier.
pub const ENV_INSTALLATION_ID: &str = "GITHUB_INSTALLATION_ID";
/// Environment variable carrying the App private key.
pub const ENV_PRIVATE_KEY_PEM: &str = "GITHUB_PRIVATE_KEY_PEM";
/// Environment variable carrying a comma separated toolset list.
pub const ENV_TOOLSETS: &str = "GITHUB_TOOLSETS";
/// Environment variable toggling read-only mode.
pub const ENV_READ_ONLY: &str = "GITHUB_READ_ONLY";
/// Environment variable toggling dynamic toolsets.
pub const ENV_DYNAMIC_TOOLSETS: &str = "GITHUB_DYNAMIC_TOOLSETS";
/// Environment variable overriding the API base URL.
pub const ENV_API_URL: &str = "GITHUB_API_URL";

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GithubMcpConfig {
    /// Transport and request limits.
    #[serde(default)]
    pub server: ServerConfig,
    /// Fallback identity credentials.
    #[serde(default)]
    pub auth: CredentialDescriptor,
    /// Toolset enablement.
    #[serde(default)]
    pub toolsets: ToolsetConfig,
    /// Upstream API settings.
    #[serde(default)]
    pub github: GithubApiConfig,
}

/// Transport selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerTransport {
    /// Single-tenant JSON-RPC over stdin/stdout.
    #[default]
    Stdio,
    /// Multi-tenant JSON-RPC over HTTP.
    Http,
}

impl ServerTransport {
    /// Returns a stable label for the transport.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
        }
    }
}

/// Server transport configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Transport to serve.
    #[serde(default)]
    pub transport: ServerTransport,
    /// Bind address for HTTP.
    #[serde(default)]
    pub bind: Option<String>,
    /// Maximum JSON-RPC request size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Minimum length of a per-request bearer credential.
    #[serde(default = "default_min_token_length")]
    pub min_token_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: ServerTransport::default(),
            bind: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            min_token_length: DEFAULT_MIN_TOKEN_LENGTH,
        }
    }
}

/// Toolset enablement configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsetConfig {
    /// Toolset names to enable; `all` enables every set.
    #[serde(default = "default_toolsets")]
    pub enabled: Vec<String>,
    /// Hide and refuse mutating tools.
    #[serde(default)]
    pub read_only: bool,
    /// Expose discovery tools that enable toolsets at runtime.
    #[serde(default)]
    pub dynamic: bool,
}

impl Default for ToolsetConfig {
    fn default() -> Self {
        Self {
            enabled: default_toolsets(),
            read_only: false,
            dynamic: false,
        }
    }
}

impl ToolsetConfig {
    /// Returns the toolset names to enable at startup.
    ///
    /// In dynamic mode `all` is dropped so sets start disabled and are
    /// enabled on demand.
    #[must_use]
    pub fn startup_sets(&self) -> Vec<String> {
        self.enabled
            .iter()
            .filter(|name| !(self.dynamic && name.as_str() == ALL_TOOLSETS))
            .cloned()
            .collect()
    }
}

/// Upstream GitHub API configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GithubApiConfig {
    /// REST API base URL (GitHub Enterprise hosts use `https://HOST/api/v3`).
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// User agent sent upstream.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per-call timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Seconds before expiry at which installation tokens are re-minted.
    #[serde(default = "default_token_refresh_margin_secs")]
    pub token_refresh_margin_secs: u64,
}

impl Default for GithubApiConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            user_agent: default_user_agent(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            token_refresh_margin_secs: DEFAULT_TOKEN_REFRESH_MARGIN_SECS,
        }
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl GithubMcpConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = fs::File::open(path)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        let mut content = String::new();
        let read = file
            .take(MAX_CONFIG_FILE_BYTES + 1)
            .read_to_string(&mut content)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        if u64::try_from(read).unwrap_or(u64::MAX) > MAX_CONFIG_FILE_BYTES {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        Self::from_toml_str(&content)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML or unknown keys.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Overlays `GITHUB_*` settings returned by `lookup`.
    ///
    /// Set values replace file values; unset values leave them untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a boolean setting cannot be parsed.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_PERSONAL_ACCESS_TOKEN) {
            self.auth.personal_access_token = Some(value);
        }
        if let Some(value) = lookup(ENV_APP_ID) {
            self.auth.app_id = Some(value);
        }
        if let Some(value) = lookup(ENV_INSTALLATION_ID) {
            self.auth.installation_id = Some(value);
        }
        if let Some(value) = lookup(ENV_PRIVATE_KEY_PEM) {
            self.auth.private_key_pem = Some(value);
        }
        if let Some(value) = lookup(ENV_TOOLSETS) {
            self.toolsets.enabled = split_list(&value);
        }
        if let Some(value) = lookup(ENV_READ_ONLY) {
            self.toolsets.read_only = parse_bool(ENV_READ_ONLY, &value)?;
        }
        if let Some(value) = lookup(ENV_DYNAMIC_TOOLSETS) {
            self.toolsets.dynamic = parse_bool(ENV_DYNAMIC_TOOLSETS, &value)?;
        }
        if let Some(value) = lookup(ENV_API_URL) {
            self.github.api_url = value;
        }
        Ok(())
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when any section is invalid, including
    /// credential resolution failures.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_toolsets()?;
        self.validate_github()?;
        self.fallback_strategy()?;
        Ok(())
    }

    /// Resolves the fallback identity strategy for the configured transport.
    ///
    /// Returns `Ok(None)` only in HTTP mode with no credentials at all.
    ///
    /// # Errors
    ///
    /// Returns the resolver's [`ConfigError`] otherwise.
    pub fn fallback_strategy(&self) -> Result<Option<AuthStrategy>, ConfigError> {
        if self.server.transport == ServerTransport::Http && self.auth.is_empty() {
            return Ok(None);
        }
        resolve_auth_strategy(&self.auth).map(Some)
    }

    /// Validates transport settings.
    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.transport == ServerTransport::Http {
            let bind = self.server.bind.as_deref().ok_or_else(|| {
                ConfigError::Invalid("http transport requires server.bind".to_string())
            })?;
            bind.parse::<SocketAddr>()
                .map_err(|_| ConfigError::Invalid(format!("invalid bind address: {bind}")))?;
        }
        if self.server.max_body_bytes == 0 || self.server.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "server.max_body_bytes must be between 1 and {MAX_BODY_BYTES_LIMIT}"
            )));
        }
        if self.server.min_token_length == 0 || self.server.min_token_length > MAX_MIN_TOKEN_LENGTH
        {
            return Err(ConfigError::Invalid(format!(
                "server.min_token_length must be between 1 and {MAX_MIN_TOKEN_LENGTH}"
            )));
        }
        Ok(())
    }

    /// Validates toolset names.
    fn validate_toolsets(&self) -> Result<(), ConfigError> {
        if self.toolsets.enabled.len() > MAX_TOOLSET_NAMES {
            return Err(ConfigError::Invalid(format!(
                "too many toolsets (max {MAX_TOOLSET_NAMES})"
            )));
        }
        for name in &self.toolsets.enabled {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("toolset name must be non-empty".to_string()));
            }
            if name.len() > MAX_TOOLSET_NAME_LENGTH {
                return Err(ConfigError::Invalid(format!("toolset name too long: {name}")));
            }
        }
        Ok(())
    }

    /// Validates upstream API settings.
    fn validate_github(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.github.api_url)
            .map_err(|err| ConfigError::Invalid(format!("invalid github.api_url: {err}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid("github.api_url must be http or https".to_string()));
        }
        if self.github.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("github.user_agent must be non-empty".to_string()));
        }
        if self.github.timeout_ms == 0 {
            return Err(ConfigError::Invalid("github.timeout_ms must be positive".to_string()));
        }
        if self.github.token_refresh_margin_secs > MAX_TOKEN_REFRESH_MARGIN_SECS {
            return Err(ConfigError::Invalid(format!(
                "github.token_refresh_margin_secs must be at most {MAX_TOKEN_REFRESH_MARGIN_SECS}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Splits a comma separated list, dropping blanks.
#[must_use]
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses a boolean environment setting.
fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Invalid(format!("{key} must be a boolean"))),
    }
}

/// Serde default for `server.max_body_bytes`.
fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Serde default for `server.min_token_length`.
fn default_min_token_length() -> usize {
    DEFAULT_MIN_TOKEN_LENGTH
}

/// Serde default for `toolsets.enabled`.
fn default_toolsets() -> Vec<String> {
    vec![ALL_TOOLSETS.to_string()]
}

/// Serde default for `github.api_url`.
fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

/// Serde default for `github.user_agent`.
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Serde default for `github.timeout_ms`.
fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Serde default for `github.token_refresh_margin_secs`.
fn default_token_refresh_margin_secs() -> u64 {
    DEFAULT_TOKEN_REFRESH_MARGIN_SECS
}
