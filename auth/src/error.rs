//! Error types for login, token rotation and logout.

use thiserror::Error;

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Closed error taxonomy for the session service.
///
/// Every failure the service can report is one of these variants. The
/// transport maps them to HTTP statuses; upstream and storage variants carry
/// detail for server-side logs that is never shown to end users.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    // ═══════════════════════════════════════════════════════════
    // Login Errors
    // ═══════════════════════════════════════════════════════════

    /// State token is unknown or has already been consumed.
    #[error("Invalid OAuth state")]
    InvalidState,

    /// The provider rejected the authorization code, or returned no token.
    #[error("OAuth code exchange failed: {0}")]
    UpstreamExchangeFailed(String),

    /// The provider did not resolve an account for the access token.
    #[error("OAuth identity lookup failed: {0}")]
    UpstreamIdentityFailed(String),

    /// The provider did not answer before the request deadline.
    #[error("OAuth provider timed out")]
    UpstreamTimeout,

    // ═══════════════════════════════════════════════════════════
    // Session Errors
    // ═══════════════════════════════════════════════════════════

    /// No session holds the presented refresh token.
    #[error("Session not found")]
    SessionNotFound,

    /// The presented refresh token belongs to a terminated session.
    #[error("Session has been logged out")]
    SessionLoggedOut,

    /// Bearer token failed signature or expiry validation.
    #[error("Invalid access token")]
    InvalidAccessToken,

    /// No profile exists for the authenticated subject.
    #[error("User not found")]
    UserNotFound,

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Any persistence failure.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The access token could not be signed.
    #[error("Token signing failed: {0}")]
    TokenSigningFailed(String),
}

impl SessionError {
    /// Stable machine-readable code for the error body.
    ///
    /// # Examples
    ///
    /// ```
    /// # use accounts_auth::SessionError;
    /// assert_eq!(SessionError::InvalidState.code(), "INVALID_STATE");
    /// assert_eq!(SessionError::UpstreamTimeout.code(), "UPSTREAM_TIMEOUT");
    /// ```
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidState => "INVALID_STATE",
            Self::UpstreamExchangeFailed(_) => "UPSTREAM_EXCHANGE_FAILED",
            Self::UpstreamIdentityFailed(_) => "UPSTREAM_IDENTITY_FAILED",
            Self::UpstreamTimeout => "UPSTREAM_TIMEOUT",
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::SessionLoggedOut => "SESSION_LOGGED_OUT",
            Self::InvalidAccessToken => "INVALID_ACCESS_TOKEN",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            Self::TokenSigningFailed(_) => "TOKEN_SIGNING_FAILED",
        }
    }

    /// Returns `true` if the caller must restart login or re-authenticate.
    ///
    /// # Examples
    ///
    /// ```
    /// # use accounts_auth::SessionError;
    /// assert!(SessionError::SessionLoggedOut.is_user_error());
    /// assert!(!SessionError::UpstreamTimeout.is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidState
                | Self::SessionNotFound
                | Self::SessionLoggedOut
                | Self::InvalidAccessToken
                | Self::UserNotFound
        )
    }

    /// Returns `true` if the external OAuth provider caused the failure.
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::UpstreamExchangeFailed(_)
                | Self::UpstreamIdentityFailed(_)
                | Self::UpstreamTimeout
        )
    }
}
