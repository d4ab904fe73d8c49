//! Mock OAuth provider for testing.

use crate::error::{Result, SessionError};
use crate::providers::{ExternalTokens, OAuthClient};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock OAuth provider.
///
/// Codes and accounts are scripted up front with [`with_login`](Self::with_login).
/// Unknown codes are rejected like an `invalid_grant`.
#[derive(Debug, Clone, Default)]
pub struct MockOAuthClient {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    /// code → external access token
    codes: HashMap<String, String>,
    /// external access token → account id
    accounts: HashMap<String, String>,
    /// Injected exchange failure.
    exchange_failure: Option<SessionError>,
    /// Injected identity failure.
    identity_failure: Option<SessionError>,
    /// Latency added to every call.
    delay: Option<Duration>,
    /// `(code, redirect_uri)` of every exchange.
    exchange_calls: Vec<(String, String)>,
}

fn lock_failed() -> SessionError {
    SessionError::StorageUnavailable("Mutex lock failed".to_string())
}

impl MockOAuthClient {
    /// Create a provider that knows no codes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a login: `code` exchanges to `external_token`, which resolves
    /// to `account_id`.
    #[must_use]
    pub fn with_login(self, code: &str, external_token: &str, account_id: &str) -> Self {
        if let Ok(mut inner) = self.inner.lock() {
            inner.codes.insert(code.to_string(), external_token.to_string());
            inner
                .accounts
                .insert(external_token.to_string(), account_id.to_string());
        }
        self
    }

    /// Add latency to every call.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        if let Ok(mut inner) = self.inner.lock() {
            inner.delay = Some(delay);
        }
        self
    }

    /// Fail every code exchange with `error`.
    #[must_use]
    pub fn with_exchange_failure(self, error: SessionError) -> Self {
        if let Ok(mut inner) = self.inner.lock() {
            inner.exchange_failure = Some(error);
        }
        self
    }

    /// Fail every identity lookup with `error`.
    #[must_use]
    pub fn with_identity_failure(self, error: SessionError) -> Self {
        if let Ok(mut inner) = self.inner.lock() {
            inner.identity_failure = Some(error);
        }
        self
    }

    /// Recorded exchanges (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn exchange_calls(&self) -> Result<Vec<(String, String)>> {
        Ok(self.inner.lock().map_err(|_| lock_failed())?.exchange_calls.clone())
    }

    fn delay(&self) -> Result<Option<Duration>> {
        Ok(self.inner.lock().map_err(|_| lock_failed())?.delay)
    }
}

impl OAuthClient for MockOAuthClient {
    fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> impl Future<Output = Result<ExternalTokens>> + Send {
        let this = self.clone();
        let code = code.to_string();
        let redirect_uri = redirect_uri.to_string();

        async move {
            if let Some(delay) = this.delay()? {
                tokio::time::sleep(delay).await;
            }

            let mut inner = this.inner.lock().map_err(|_| lock_failed())?;
            inner.exchange_calls.push((code.clone(), redirect_uri));

            if let Some(error) = inner.exchange_failure.clone() {
                return Err(error);
            }

            let access_token = inner.codes.get(&code).cloned().ok_or_else(|| {
                SessionError::UpstreamExchangeFailed("invalid_grant".to_string())
            })?;

            Ok(ExternalTokens {
                refresh_token: Some(format!("{access_token}-refresh")),
                access_token,
            })
        }
    }

    fn account_id(&self, access_token: &str) -> impl Future<Output = Result<String>> + Send {
        let this = self.clone();
        let access_token = access_token.to_string();

        async move {
            if let Some(delay) = this.delay()? {
                tokio::time::sleep(delay).await;
            }

            let inner = this.inner.lock().map_err(|_| lock_failed())?;

            if let Some(error) = inner.identity_failure.clone() {
                return Err(error);
            }

            inner.accounts.get(&access_token).cloned().ok_or_else(|| {
                SessionError::UpstreamIdentityFailed("unknown access token".to_string())
            })
        }
    }
}
