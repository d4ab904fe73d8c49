//! Persisted records and operation results.
//!
//! Each table row has an auto-increment `id` and storage-maintained
//! timestamps. The `New*` structs carry only caller-supplied columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════
// OAuth State
// ═══════════════════════════════════════════════════════════════════════

/// One pending login attempt.
///
/// Created by `begin_login`, claimed while a `complete_login` runs, marked
/// used once the login succeeds, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct OauthState {
    /// Row id.
    pub id: i64,

    /// Opaque anti-forgery token sent to the provider.
    pub state_token: String,

    /// Set once the login completes.
    pub used: bool,

    /// Held by an in-flight login; released again if that login fails.
    pub claimed: bool,

    /// Opaque caller value returned on completion.
    pub query_string: String,

    /// Created timestamp.
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for [`OauthState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOauthState {
    /// Opaque anti-forgery token.
    pub state_token: String,

    /// Opaque caller value.
    pub query_string: String,
}

// ═══════════════════════════════════════════════════════════════════════
// Audit Logs
// ═══════════════════════════════════════════════════════════════════════

/// Upstream provider tokens, kept for traceability. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct OauthTokens {
    /// Row id.
    pub id: i64,

    /// Account the tokens were issued for.
    pub account_id: String,

    /// Authorization code that was exchanged.
    pub authorization_code: String,

    /// Provider access token.
    pub external_access_token: String,

    /// Provider refresh token, when one was issued.
    pub external_refresh_token: Option<String>,

    /// Created timestamp.
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for [`OauthTokens`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOauthTokens {
    /// Account the tokens were issued for.
    pub account_id: String,

    /// Authorization code that was exchanged.
    pub authorization_code: String,

    /// Provider access token.
    pub external_access_token: String,

    /// Provider refresh token.
    pub external_refresh_token: Option<String>,
}

/// Every signed access token issued. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct UserToken {
    /// Row id.
    pub id: i64,

    /// Subject of the token.
    pub account_id: String,

    /// Signed token.
    pub token_value: String,

    /// Expiry encoded in the token.
    pub expires_at: DateTime<Utc>,

    /// Created timestamp.
    pub created_at: DateTime<Utc>,
}

/// Insert payload for [`UserToken`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserToken {
    /// Subject of the token.
    pub account_id: String,

    /// Signed token.
    pub token_value: String,

    /// Expiry encoded in the token.
    pub expires_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════
// Sessions
// ═══════════════════════════════════════════════════════════════════════

/// The current session of one account.
///
/// At most one row exists per account. The value is overwritten on every
/// login and refresh; logout only sets `is_logged_out`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct RefreshToken {
    /// Row id.
    pub id: i64,

    /// Owning account.
    pub account_id: String,

    /// Current opaque refresh token.
    pub refresh_token_value: String,

    /// Soft-delete flag.
    pub is_logged_out: bool,

    /// When the session was logged out.
    pub logout_at: Option<DateTime<Utc>>,

    /// User-Agent of the request that last logged in.
    pub user_agent: Option<String>,

    /// Created timestamp.
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp.
    pub updated_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════
// Users
// ═══════════════════════════════════════════════════════════════════════

/// Profile row, populated by account provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct User {
    /// Row id.
    pub id: i64,

    /// External user id (the access token subject).
    pub user_id: String,

    /// Display name.
    pub name: String,

    /// Avatar URL.
    pub icon: String,

    /// Created timestamp.
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Public profile projection returned by `/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    /// External user id.
    pub user_id: String,

    /// Display name.
    pub name: String,

    /// Avatar URL.
    pub icon: String,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            name: user.name,
            icon: user.icon,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Operation Results
// ═══════════════════════════════════════════════════════════════════════

/// Access token plus refresh token handed to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Signed bearer token.
    pub access_token: String,

    /// Opaque refresh token.
    pub refresh_token: String,
}

/// Result of a completed OAuth login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    /// Account resolved by the provider.
    pub account_id: String,

    /// Newly issued tokens.
    pub token: TokenPair,

    /// Value supplied to `begin_login`, unmodified.
    pub query_string: String,
}
