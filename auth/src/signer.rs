//! Access token signing and verification.
//!
//! Access tokens are HS256 JWTs carrying the account id as subject. They are
//! verified with the shared secret alone; no storage lookup is involved.

use crate::error::{Result, SessionError};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims embedded in every access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id.
    pub sub: String,

    /// Issued at (unix seconds).
    pub iat: i64,

    /// Expiry (unix seconds).
    pub exp: i64,

    /// Unique token id.
    pub jti: String,
}

/// A freshly minted access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedToken {
    /// Encoded JWT.
    pub value: String,

    /// Expiry encoded in the token.
    pub expires_at: DateTime<Utc>,
}

/// HS256 signer for access tokens.
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenSigner {
    /// Create a signer from a shared secret and token lifetime.
    #[must_use]
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Token lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign an access token for `subject`, valid from `issued_at` for the
    /// configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::TokenSigningFailed`] if the lifetime is not
    /// positive, the expiry is out of range, or encoding fails.
    pub fn sign(&self, subject: &str, issued_at: DateTime<Utc>) -> Result<SignedToken> {
        if self.ttl <= Duration::zero() {
            return Err(SessionError::TokenSigningFailed(format!(
                "access token lifetime must be positive, got {}s",
                self.ttl.num_seconds()
            )));
        }

        let expires_at = issued_at.checked_add_signed(self.ttl).ok_or_else(|| {
            SessionError::TokenSigningFailed("expiry out of range".to_string())
        })?;
        let claims = Claims {
            sub: subject.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let value = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| SessionError::TokenSigningFailed(e.to_string()))?;

        // Expiry is stored with whole-second precision, matching the claim.
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| SessionError::TokenSigningFailed("expiry out of range".to_string()))?;

        Ok(SignedToken { value, expires_at })
    }

    /// Verify signature and expiry of an access token.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidAccessToken`] if the token is malformed,
    /// signed with another secret, expired, or has an empty subject.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Access token rejected");
                SessionError::InvalidAccessToken
            })?;

        if data.claims.sub.is_empty() {
            return Err(SessionError::InvalidAccessToken);
        }

        Ok(data.claims)
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
