// crates/github-mcp-config/src/credentials.rs
// ============================================================================
// Module: Credential Resolution
// Description: Credential descriptor model and auth strategy resolver.
// Purpose: Decide the single process-wide fallback identity, failing closed.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`CredentialDescriptor`] carries the four credential settings consumed at
//! startup. [`resolve_auth_strategy`] enforces that exactly one strategy is
//! configured: either a static personal access token, or all three GitHub App
//! fields needed to mint installation tokens. Any other combination is a
//! configuration error, including a token configured next to a partial App
//! setup.
//!
//! ## Invariants
//! - Resolution is pure and idempotent; it never reads the environment.
//! - Blank values (empty or whitespace-only) count as absent.
//! - `Debug` output never contains the token or the signing key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigError;

// ============================================================================
// SECTION: Field Labels
// ============================================================================

/// Configuration key for the static personal access token.
pub const PERSONAL_ACCESS_TOKEN_FIELD: &str = "personal_access_token";
/// Configuration key for the GitHub App identifier.
pub const APP_ID_FIELD: &str = "app_id";
/// Configuration key for the App installation identifier.
pub const INSTALLATION_ID_FIELD: &str = "installation_id";
/// Configuration key for the App private key (PEM).
pub const PRIVATE_KEY_PEM_FIELD: &str = "private_key_pem";

// ============================================================================
// SECTION: Credential Descriptor
// ============================================================================

/// Credential settings supplied by configuration.
///
/// # Invariants
/// - Immutable after loading; validated by [`resolve_auth_strategy`].
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialDescriptor {
    /// Long-lived bearer token used as-is.
    #[serde(default)]
    pub personal_access_token: Option<String>,
    /// GitHub App identifier (issuer of minted assertions).
    #[serde(default)]
    pub app_id: Option<String>,
    /// GitHub App installation identifier.
    #[serde(default)]
    pub installation_id: Option<String>,
    /// GitHub App private key in PEM form.
    #[serde(default)]
    pub private_key_pem: Option<String>,
}

impl CredentialDescriptor {
    /// Builds a descriptor for a static token.
    #[must_use]
    pub fn static_token(token: impl Into<String>) -> Self {
        Self {
            personal_access_token: Some(token.into()),
            ..Self::default()
        }
    }

    /// Builds a descriptor for a GitHub App installation.
    #[must_use]
    pub fn derived_identity(
        app_id: impl Into<String>,
        installation_id: impl Into<String>,
        private_key_pem: impl Into<String>,
    ) -> Self {
        Self {
            personal_access_token: None,
            app_id: Some(app_id.into()),
            installation_id: Some(installation_id.into()),
            private_key_pem: Some(private_key_pem.into()),
        }
    }

    /// Returns true when no credential field carries a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !present(self.personal_access_token.as_deref())
            && self.derived_fields_present().is_empty()
    }

    /// Returns the non-blank static token, if any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        non_blank(self.personal_access_token.as_deref())
    }

    /// Returns the non-blank App fields as `(app_id, installation_id, pem)`.
    #[must_use]
    pub fn derived_parts(&self) -> Option<(&str, &str, &str)> {
        Some((
            non_blank(self.app_id.as_deref())?,
            non_blank(self.installation_id.as_deref())?,
            non_blank(self.private_key_pem.as_deref())?,
        ))
    }

    /// Labels of the App fields that carry a value, in declaration order.
    fn derived_fields_present(&self) -> Vec<&'static str> {
        self.derived_fields()
            .into_iter()
            .filter_map(|(label, value)| present(value).then_some(label))
            .collect()
    }

    /// Labels of the App fields that are blank or absent, in declaration order.
    fn derived_fields_missing(&self) -> Vec<&'static str> {
        self.derived_fields()
            .into_iter()
            .filter_map(|(label, value)| (!present(value)).then_some(label))
            .collect()
    }

    /// App fields paired with their configuration labels.
    fn derived_fields(&self) -> [(&'static str, Option<&str>); 3] {
        [
            (APP_ID_FIELD, self.app_id.as_deref()),
            (INSTALLATION_ID_FIELD, self.installation_id.as_deref()),
            (PRIVATE_KEY_PEM_FIELD, self.private_key_pem.as_deref()),
        ]
    }
}

impl fmt::Debug for CredentialDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialDescriptor")
            .field(PERSONAL_ACCESS_TOKEN_FIELD, &redacted(self.personal_access_token.as_deref()))
            .field(APP_ID_FIELD, &self.app_id)
            .field(INSTALLATION_ID_FIELD, &self.installation_id)
            .field(PRIVATE_KEY_PEM_FIELD, &redacted(self.private_key_pem.as_deref()))
            .finish()
    }
}

// ============================================================================
// SECTION: Auth Strategy
// ============================================================================

/// Authentication strategy for the process-wide fallback identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStrategy {
    /// Static personal access token.
    StaticToken,
    /// Installation tokens minted from GitHub App credentials.
    DerivedIdentity,
}

impl AuthStrategy {
    /// Returns a stable label for the strategy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StaticToken => "static_token",
            Self::DerivedIdentity => "derived_identity",
        }
    }
}

/// Resolves the auth strategy configured by `descriptor`.
///
/// # Errors
///
/// - [`ConfigError::MissingCredentials`] when nothing is configured.
/// - [`ConfigError::ConflictingCredentials`] when a token is configured along
///   with any App field.
/// - [`ConfigError::IncompleteDerivedIdentity`] when only some App fields are
///   configured.
pub fn resolve_auth_strategy(
    descriptor: &CredentialDescriptor,
) -> Result<AuthStrategy, ConfigError> {
    let has_token = present(descriptor.personal_access_token.as_deref());
    let derived = descriptor.derived_fields_present();
    match (has_token, derived.len()) {
        (false, 0) => Err(ConfigError::MissingCredentials),
        (true, 0) => Ok(AuthStrategy::StaticToken),
        (true, _) => Err(ConfigError::ConflictingCredentials {
            fields: derived,
        }),
        (false, 3) => Ok(AuthStrategy::DerivedIdentity),
        (false, _) => Err(ConfigError::IncompleteDerivedIdentity {
            missing: descriptor.derived_fields_missing(),
        }),
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true when the value is set and not blank.
fn present(value: Option<&str>) -> bool {
    non_blank(value).is_some()
}

/// Filters out blank values.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

/// Debug placeholder for secret fields.
const fn redacted(value: Option<&str>) -> Option<&'static str> {
    match value {
        Some(_) => Some("<redacted>"),
        None => None,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
