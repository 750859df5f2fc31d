// crates/github-mcp-server/src/github.rs
// ============================================================================
// Module: GitHub API Client
// Description: Authenticated REST client factory for upstream calls.
// Purpose: Build one client per credential so callers never share identity.
// Dependencies: async-trait, reqwest, serde_json
// ============================================================================

//! ## Overview
//! [`ClientFactory::make_client`] returns a [`GithubApi`] bound to exactly one
//! credential. The tool router calls it once per tool call with the credential
//! from that call's request context (or the fallback identity in stdio mode),
//! so the credential is never stored beyond the call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use github_mcp_config::GithubApiConfig;
use github_mcp_contract::HttpMethod;
use reqwest::header::ACCEPT;
use reqwest::header::AUTHORIZATION;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::header::USER_AGENT;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Media type requested from the REST API.
const GITHUB_ACCEPT: &str = "application/vnd.github+json";
/// API version header name.
const API_VERSION_HEADER: &str = "x-github-api-version";
/// API version pinned for all calls.
const API_VERSION: &str = "2022-11-28";
/// Upper bound on error message bytes kept from upstream bodies.
const MAX_ERROR_MESSAGE_BYTES: usize = 512;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Upstream call failures.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Request could not be sent or timed out.
    #[error("github request failed: {0}")]
    Transport(String),
    /// Upstream answered with a non-success status.
    #[error("github returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Upstream message.
        message: String,
    },
    /// Response body was not JSON.
    #[error("github response decode failed: {0}")]
    Decode(String),
}

// ============================================================================
// SECTION: Traits
// ============================================================================

/// Authenticated GitHub REST client.
#[async_trait]
pub trait GithubApi: Send + Sync {
    /// Issues one REST call.
    ///
    /// `path` is relative to the API base and already percent-encoded.
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(String, String)],
        body: Option<Value>,
    ) -> Result<Value, ApiError>;
}

/// Builds clients bound to a credential.
pub trait ClientFactory: Send + Sync {
    /// Returns a client that authenticates with `credential`.
    fn make_client(&self, credential: &str) -> Arc<dyn GithubApi>;
}

// ============================================================================
// SECTION: Reqwest Implementation
// ============================================================================

/// Client factory backed by a shared `reqwest` connection pool.
#[derive(Clone)]
pub struct ReqwestClientFactory {
    /// Shared HTTP client.
    http: reqwest::Client,
    /// API base URL without trailing slash.
    base_url: Arc<str>,
}

impl ReqwestClientFactory {
    /// Builds a factory from upstream settings.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] when the HTTP client cannot be built.
    pub fn new(config: &GithubApiConfig) -> Result<Self, ApiError> {
        let http = build_http_client(config)?;
        Ok(Self {
            http,
            base_url: Arc::from(config.api_url.trim_end_matches('/')),
        })
    }
}

impl ClientFactory for ReqwestClientFactory {
    fn make_client(&self, credential: &str) -> Arc<dyn GithubApi> {
        Arc::new(ReqwestGithubClient {
            http: self.http.clone(),
            base_url: Arc::clone(&self.base_url),
            authorization: format!("Bearer {credential}"),
        })
    }
}

/// Client bound to one credential.
struct ReqwestGithubClient {
    /// Shared HTTP client.
    http: reqwest::Client,
    /// API base URL without trailing slash.
    base_url: Arc<str>,
    /// `Authorization` header value.
    authorization: String,
}

#[async_trait]
impl GithubApi for ReqwestGithubClient {
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(String, String)],
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{path}", self.base_url);
        let mut builder = self
            .http
            .request(reqwest_method(method), url)
            .header(AUTHORIZATION, &self.authorization);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        let response = builder.send().await.map_err(|err| ApiError::Transport(err.to_string()))?;
        decode_response(response).await
    }
}

/// Builds the shared HTTP client with default headers.
pub(crate) fn build_http_client(config: &GithubApiConfig) -> Result<reqwest::Client, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
    headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));
    let agent = HeaderValue::from_str(&config.user_agent)
        .map_err(|_| ApiError::Transport("invalid user agent".to_string()))?;
    headers.insert(USER_AGENT, agent);
    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_millis(config.timeout_ms))
        .build()
        .map_err(|err| ApiError::Transport(err.to_string()))
}

/// Maps a response to JSON or a status error.
pub(crate) async fn decode_response(response: reqwest::Response) -> Result<Value, ApiError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(|err| ApiError::Transport(err.to_string()))?;
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: upstream_message(&bytes),
        });
    }
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes).map_err(|err| ApiError::Decode(err.to_string()))
}

/// Extracts the `message` field of an upstream error body, bounded.
fn upstream_message(bytes: &[u8]) -> String {
    let message = serde_json::from_slice::<Value>(bytes)
        .ok()
        .and_then(|value| value.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| String::from_utf8_lossy(bytes).into_owned());
    let mut end = message.len().min(MAX_ERROR_MESSAGE_BYTES);
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    message[.. end].to_string()
}

/// Converts a contract method to a `reqwest` method.
fn reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
