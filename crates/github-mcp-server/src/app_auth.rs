// crates/github-mcp-server/src/app_auth.rs
// ============================================================================
// Module: GitHub App Installation Tokens
// Description: Derived identity that mints and caches installation tokens.
// Purpose: Serve a currently valid token to every caller with one mint at a time.
// Dependencies: async-trait, jsonwebtoken, reqwest, serde, time, tokio
// ============================================================================

//! ## Overview
//! [`InstallationTokenSource`] holds the parsed App identifiers, the signing
//! key, and a cached installation token. [`InstallationTokenSource::current_token`]
//! returns the cached token while it is outside the refresh margin and mints a
//! new one otherwise.
//!
//! Minting is single flight: the first caller to see a stale cache spawns a
//! mint task and publishes its outcome on a `watch` channel; every concurrent
//! caller awaits the same channel. Callers never own the mint, so a caller
//! that is cancelled does not cancel the mint other callers are waiting on.
//!
//! ## Invariants
//! - At most one mint task is in flight.
//! - The cache slot is replaced only by a successful mint.
//! - A failed mint falls back to the cached token while it has not expired.
//! - Tokens and the signing key never appear in `Debug` output or audit events.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use async_trait::async_trait;
use github_mcp_config::GithubApiConfig;
use jsonwebtoken::Algorithm;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::watch;

use crate::audit::AuditSink;
use crate::audit::TokenMintEvent;
use crate::github::build_http_client;
use crate::github::decode_response;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Seconds the assertion `iat` is backdated to absorb clock drift.
pub const ASSERTION_BACKDATE_SECS: i64 = 60;
/// Assertion lifetime in seconds after `now` (GitHub caps it at ten minutes).
pub const ASSERTION_LIFETIME_SECS: i64 = 9 * 60;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// GitHub App credential and mint errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppAuthError {
    /// `app_id` is not a positive integer.
    #[error("invalid app_id: must be a positive integer")]
    InvalidIssuerId,
    /// `installation_id` is not a positive integer.
    #[error("invalid installation_id: must be a positive integer")]
    InvalidInstallationId,
    /// `private_key_pem` is not a usable RSA private key.
    #[error("invalid private_key_pem: {0}")]
    InvalidSigningKey(String),
    /// Minting an installation token failed.
    #[error("installation token mint failed: {cause}")]
    MintFailed {
        /// Failure cause.
        cause: String,
    },
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Claims of the App assertion exchanged for an installation token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Issued-at, backdated by [`ASSERTION_BACKDATE_SECS`].
    pub iat: i64,
    /// Expiry, [`ASSERTION_LIFETIME_SECS`] after now.
    pub exp: i64,
    /// App identifier.
    pub iss: String,
}

/// Installation token with its upstream-declared expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct InstallationToken {
    /// Bearer token.
    pub token: String,
    /// Expiry declared by the upstream.
    pub expires_at: OffsetDateTime,
}

impl fmt::Debug for InstallationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallationToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Outcome published to mint waiters.
type MintOutcome = Result<InstallationToken, AppAuthError>;

// ============================================================================
// SECTION: Traits
// ============================================================================

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> OffsetDateTime;
}

/// Wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Exchanges a signed App assertion for an installation token.
#[async_trait]
pub trait InstallationTokenMinter: Send + Sync {
    /// Mints a token for `installation_id` using `assertion`.
    ///
    /// # Errors
    ///
    /// Returns a human readable cause on failure.
    async fn mint(
        &self,
        assertion: &str,
        installation_id: u64,
    ) -> Result<InstallationToken, String>;
}

// ============================================================================
// SECTION: GitHub Minter
// ============================================================================

/// Minter calling `POST /app/installations/{id}/access_tokens`.
pub struct GithubInstallationMinter {
    /// Shared HTTP client.
    http: reqwest::Client,
    /// API base URL without trailing slash.
    base_url: String,
}

impl GithubInstallationMinter {
    /// Builds a minter from upstream settings.
    ///
    /// # Errors
    ///
    /// Returns [`AppAuthError::MintFailed`] when the HTTP client cannot be built.
    pub fn new(config: &GithubApiConfig) -> Result<Self, AppAuthError> {
        let http = build_http_client(config).map_err(|err| AppAuthError::MintFailed {
            cause: err.to_string(),
        })?;
        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Access token response body.
#[derive(Deserialize)]
struct AccessTokenResponse {
    /// Installation token.
    token: String,
    /// RFC 3339 expiry.
    expires_at: String,
}

#[async_trait]
impl InstallationTokenMinter for GithubInstallationMinter {
    async fn mint(
        &self,
        assertion: &str,
        installation_id: u64,
    ) -> Result<InstallationToken, String> {
        let url = format!("{}/app/installations/{installation_id}/access_tokens", self.base_url);
        let response =
            self.http.post(url).bearer_auth(assertion).send().await.map_err(|err| err.to_string())?;
        let body = decode_response(response).await.map_err(|err| err.to_string())?;
        let parsed: AccessTokenResponse = serde_json::from_value(body)
            .map_err(|err| format!("invalid access token response: {err}"))?;
        let expires_at = OffsetDateTime::parse(&parsed.expires_at, &Rfc3339)
            .map_err(|err| format!("invalid expires_at: {err}"))?;
        Ok(InstallationToken {
            token: parsed.token,
            expires_at,
        })
    }
}

// ============================================================================
// SECTION: Token Source
// ============================================================================

/// Collaborators of an [`InstallationTokenSource`].
pub struct TokenSourceConfig {
    /// Token exchange.
    pub minter: Arc<dyn InstallationTokenMinter>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// A cached token is re-minted once `now >= expires_at - refresh_margin`.
    pub refresh_margin: Duration,
    /// Audit sink for mint outcomes.
    pub audit: Arc<dyn AuditSink>,
}

/// Auto-refreshing installation identity.
#[derive(Clone)]
pub struct InstallationTokenSource {
    /// Shared state.
    inner: Arc<SourceInner>,
}

/// Shared state of a token source.
struct SourceInner {
    /// Parsed App identifier.
    app_id: u64,
    /// Parsed installation identifier.
    installation_id: u64,
    /// Assertion signing key.
    signing_key: EncodingKey,
    /// Collaborators.
    config: TokenSourceConfig,
    /// Cache and in-flight mint.
    state: Mutex<CacheState>,
}

/// Mutable cache state.
#[derive(Default)]
struct CacheState {
    /// Last successfully minted token.
    cached: Option<InstallationToken>,
    /// Receiver of the mint in flight, if any.
    in_flight: Option<watch::Receiver<Option<MintOutcome>>>,
}

impl InstallationTokenSource {
    /// Parses App credentials and builds a token source.
    ///
    /// # Errors
    ///
    /// - [`AppAuthError::InvalidIssuerId`] / [`AppAuthError::InvalidInstallationId`] when an id
    ///   is not a positive integer.
    /// - [`AppAuthError::InvalidSigningKey`] when the PEM is not a usable RSA private key.
    pub fn new(
        app_id: &str,
        installation_id: &str,
        private_key_pem: &str,
        config: TokenSourceConfig,
    ) -> Result<Self, AppAuthError> {
        let app_id = parse_positive_id(app_id).ok_or(AppAuthError::InvalidIssuerId)?;
        let installation_id =
            parse_positive_id(installation_id).ok_or(AppAuthError::InvalidInstallationId)?;
        let signing_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|err| AppAuthError::InvalidSigningKey(err.to_string()))?;
        let trial_claims = AssertionClaims {
            iat: 0,
            exp: 0,
            iss: app_id.to_string(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &trial_claims, &signing_key)
            .map_err(|err| AppAuthError::InvalidSigningKey(err.to_string()))?;
        Ok(Self {
            inner: Arc::new(SourceInner {
                app_id,
                installation_id,
                signing_key,
                config,
                state: Mutex::new(CacheState::default()),
            }),
        })
    }

    /// Returns the parsed installation identifier.
    #[must_use]
    pub fn installation_id(&self) -> u64 {
        self.inner.installation_id
    }

    /// Returns a currently valid installation token.
    ///
    /// # Errors
    ///
    /// Returns [`AppAuthError::MintFailed`] when a mint was needed, failed, and
    /// no unexpired cached token is available.
    pub async fn current_token(&self) -> Result<String, AppAuthError> {
        let mut receiver = {
            let mut state = self.inner.lock_state();
            if let Some(token) = self.inner.fresh_token(&state) {
                return Ok(token);
            }
            let live = state.in_flight.as_ref().filter(|rx| rx.has_changed().is_ok()).cloned();
            if let Some(receiver) = live {
                receiver
            } else {
                let receiver = Arc::clone(&self.inner).spawn_mint();
                state.in_flight = Some(receiver.clone());
                receiver
            }
        };
        let outcome = match receiver.wait_for(Option::is_some).await {
            Ok(outcome) => Option::clone(&outcome),
            Err(_) => None,
        };
        match outcome {
            Some(Ok(token)) => Ok(token.token),
            Some(Err(err)) => self.inner.unexpired_or(err),
            None => Err(AppAuthError::MintFailed {
                cause: "mint task ended without a result".to_string(),
            }),
        }
    }
}

impl SourceInner {
    /// Locks the cache state.
    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached token when it is outside the refresh margin.
    fn fresh_token(&self, state: &CacheState) -> Option<String> {
        let cached = state.cached.as_ref()?;
        let refresh_at = cached.expires_at.checked_sub(self.config.refresh_margin)?;
        (self.config.clock.now() < refresh_at).then(|| cached.token.clone())
    }

    /// Returns the cached token if it has not expired, else `err`.
    fn unexpired_or(&self, err: AppAuthError) -> Result<String, AppAuthError> {
        let state = self.lock_state();
        match &state.cached {
            Some(cached) if self.config.clock.now() < cached.expires_at => Ok(cached.token.clone()),
            _ => Err(err),
        }
    }

    /// Spawns the mint task and returns the receiver its outcome is published on.
    fn spawn_mint(self: Arc<Self>) -> watch::Receiver<Option<MintOutcome>> {
        let (sender, receiver) = watch::channel(None);
        tokio::spawn(async move {
            let outcome = self.mint_once().await;
            self.settle(&outcome);
            sender.send_replace(Some(outcome));
        });
        receiver
    }

    /// Signs an assertion and exchanges it.
    async fn mint_once(&self) -> MintOutcome {
        let assertion = self.sign_assertion()?;
        self.config.minter.mint(&assertion, self.installation_id).await.map_err(|cause| {
            AppAuthError::MintFailed {
                cause,
            }
        })
    }

    /// Signs the App assertion for the current time.
    fn sign_assertion(&self) -> Result<String, AppAuthError> {
        let now = self.config.clock.now().unix_timestamp();
        let claims = AssertionClaims {
            iat: now - ASSERTION_BACKDATE_SECS,
            exp: now + ASSERTION_LIFETIME_SECS,
            iss: self.app_id.to_string(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key).map_err(
            |err| AppAuthError::MintFailed {
                cause: format!("assertion signing failed: {err}"),
            },
        )
    }

    /// Stores a successful mint, clears the in-flight slot, and audits.
    fn settle(&self, outcome: &MintOutcome) {
        let event = {
            let mut state = self.lock_state();
            state.in_flight = None;
            match outcome {
                Ok(token) => {
                    state.cached = Some(token.clone());
                    let expires_at = token.expires_at.format(&Rfc3339).unwrap_or_default();
                    TokenMintEvent::minted(self.installation_id, expires_at)
                }
                Err(err) => {
                    let now = self.config.clock.now();
                    let serving_cached =
                        state.cached.as_ref().is_some_and(|cached| now < cached.expires_at);
                    TokenMintEvent::failed(self.installation_id, err.to_string(), serving_cached)
                }
            }
        };
        self.config.audit.record_token_mint(&event);
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a strictly positive integer identifier.
fn parse_positive_id(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok().filter(|id| *id > 0)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
