//! HTTP client for the external OAuth provider.

use crate::constants::{AUTHORIZATION_CODE_GRANT, DEFAULT_UPSTREAM_TIMEOUT_SECS};
use crate::error::{Result, SessionError};
use crate::providers::{ExternalTokens, OAuthClient};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// OAuth provider reached over HTTP.
///
/// Talks to two endpoints under `base_url`:
///
/// - `POST /token`: form-encoded code exchange, HTTP Basic client auth
/// - `GET /me?accessToken=...`: account id of a provider access token
///
/// # Example
///
/// ```no_run
/// use accounts_auth::providers::HttpOAuthClient;
///
/// let client = HttpOAuthClient::new(
///     "https://gateway.example.com/oauth".to_string(),
///     "client-id".to_string(),
///     "client-secret".to_string(),
/// );
/// ```
#[derive(Clone)]
pub struct HttpOAuthClient {
    /// Provider base URL, without trailing slash.
    base_url: String,

    /// Client id registered with the provider.
    client_id: String,

    /// Client secret (keep confidential).
    client_secret: String,

    /// HTTP client for making requests.
    http_client: Client,

    /// Per-request timeout.
    ///
    /// Default: 10 seconds
    timeout: Duration,
}

impl HttpOAuthClient {
    /// Create a client for the provider at `base_url`.
    #[must_use]
    pub fn new(base_url: String, client_id: String, client_secret: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
            http_client: Client::new(),
            timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        }
    }

    /// Set per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a preconfigured HTTP client (shared pool, proxies).
    #[must_use]
    pub fn with_http_client(mut self, http_client: Client) -> Self {
        self.http_client = http_client;
        self
    }
}

impl std::fmt::Debug for HttpOAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpOAuthClient")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl OAuthClient for HttpOAuthClient {
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<ExternalTokens> {
        let params = [
            ("grant_type", AUTHORIZATION_CODE_GRANT),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.client_id.as_str()),
        ];

        let response = self
            .http_client
            .post(format!("{}/token", self.base_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&params)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| transport_error(&e, SessionError::UpstreamExchangeFailed))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body = %error_body, "OAuth token exchange failed");
            return Err(SessionError::UpstreamExchangeFailed(format!(
                "provider returned {status}"
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| transport_error(&e, SessionError::UpstreamExchangeFailed))?;

        let access_token = token_response
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                SessionError::UpstreamExchangeFailed("no access token returned".to_string())
            })?;

        Ok(ExternalTokens {
            access_token,
            refresh_token: token_response.refresh_token.filter(|t| !t.is_empty()),
        })
    }

    async fn account_id(&self, access_token: &str) -> Result<String> {
        let response = self
            .http_client
            .get(format!("{}/me", self.base_url))
            .query(&[("accessToken", access_token)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| transport_error(&e, SessionError::UpstreamIdentityFailed))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body = %error_body, "OAuth identity lookup failed");
            return Err(SessionError::UpstreamIdentityFailed(format!(
                "provider returned {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&e, SessionError::UpstreamIdentityFailed))?;

        // The provider answers with a JSON string; accept a bare body too.
        let account_id = serde_json::from_str::<String>(&body)
            .unwrap_or_else(|_| body.trim().to_string());

        if account_id.is_empty() {
            return Err(SessionError::UpstreamIdentityFailed(
                "empty account id".to_string(),
            ));
        }

        Ok(account_id)
    }
}

/// Map a reqwest failure, keeping timeouts distinct.
fn transport_error(e: &reqwest::Error, wrap: fn(String) -> SessionError) -> SessionError {
    if e.is_timeout() {
        tracing::error!(error = %e, "OAuth provider timed out");
        SessionError::UpstreamTimeout
    } else {
        wrap(e.to_string())
    }
}

/// Token endpoint response. Field names vary between snake and camel case.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default, alias = "accessToken")]
    access_token: Option<String>,
    #[serde(default, alias = "refreshToken")]
    refresh_token: Option<String>,
}
