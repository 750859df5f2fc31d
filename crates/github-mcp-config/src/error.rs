// crates/github-mcp-config/src/error.rs
// ============================================================================
// Module: Config Errors
// Description: Error taxonomy for configuration loading and validation.
// Purpose: Surface fatal startup errors with actionable messages.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Startup errors are fatal: the server refuses to start and the operator sees
//! the message. Credential errors name the strategy and the offending fields.

use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither a token nor any GitHub App field is configured.
    #[error(
        "missing credentials: configure personal_access_token, or app_id + installation_id + \
         private_key_pem"
    )]
    MissingCredentials,
    /// A token is configured together with GitHub App fields.
    #[error(
        "conflicting credentials: personal_access_token cannot be combined with GitHub App \
         fields ({})",
        .fields.join(", ")
    )]
    ConflictingCredentials {
        /// GitHub App fields that were set next to the token.
        fields: Vec<&'static str>,
    },
    /// Only some GitHub App fields are configured.
    #[error("incomplete GitHub App credentials: missing {}", .missing.join(", "))]
    IncompleteDerivedIdentity {
        /// GitHub App fields that are missing.
        missing: Vec<&'static str>,
    },
    /// Config file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// Config file could not be parsed.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Config values are invalid.
    #[error("invalid config: {0}")]
    Invalid(String),
}
