//! Session service configuration.
//!
//! Values are provided by the application, not hardcoded.

use crate::constants::DEFAULT_UPSTREAM_TIMEOUT_SECS;
use std::time::Duration;

/// Configuration for [`SessionService`](crate::service::SessionService).
///
/// The access token lifetime belongs to the
/// [`TokenSigner`](crate::signer::TokenSigner), which is the only place
/// that applies it.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Deadline for each login's calls to the OAuth provider.
    ///
    /// Default: 10 seconds
    pub upstream_timeout: Duration,

    /// Redirect URI sent on the code exchange when the request has none.
    pub default_redirect_uri: String,
}

impl SessionConfig {
    /// Create a configuration with the given default redirect URI.
    #[must_use]
    pub const fn new(default_redirect_uri: String) -> Self {
        Self {
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            default_redirect_uri,
        }
    }

    /// Set upstream deadline.
    #[must_use]
    pub const fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_builder() {
        let config = SessionConfig::new("https://app.example.com/callback".to_string())
            .with_upstream_timeout(Duration::from_secs(3));

        assert_eq!(config.default_redirect_uri, "https://app.example.com/callback");
        assert_eq!(config.upstream_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.upstream_timeout, Duration::from_secs(10));
        assert!(config.default_redirect_uri.is_empty());
    }
}
