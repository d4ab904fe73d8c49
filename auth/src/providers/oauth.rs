//! Remote OAuth provider trait.

use crate::error::Result;

/// Tokens returned by the provider's code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalTokens {
    /// Provider access token. Never empty.
    pub access_token: String,

    /// Provider refresh token, if issued.
    pub refresh_token: Option<String>,
}

/// Client for the external OAuth provider.
///
/// This system is a client of the provider, not a provider itself. Client
/// credentials are held by the implementation.
///
/// # Implementation Notes
///
/// - Transport errors, rejections and malformed responses of the exchange
///   map to `SessionError::UpstreamExchangeFailed`
/// - Failures of the identity lookup map to `SessionError::UpstreamIdentityFailed`
/// - Timeouts map to `SessionError::UpstreamTimeout`
pub trait OAuthClient: Send + Sync {
    /// Exchange an authorization code for provider tokens.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network request fails or times out
    /// - Provider rejects the code
    /// - No access token is returned
    fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> impl std::future::Future<Output = Result<ExternalTokens>> + Send;

    /// Resolve the account id that owns a provider access token.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, times out, or yields an empty id.
    fn account_id(
        &self,
        access_token: &str,
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}
