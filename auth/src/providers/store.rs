//! Persistence traits.
//!
//! The store is passive: it holds rows and enforces uniqueness, while every
//! lifecycle decision is made by the session service.

use crate::error::Result;
use crate::records::{
    NewOauthState, NewOauthTokens, NewUserToken, OauthState, OauthTokens, RefreshToken, User,
    UserToken,
};
use chrono::{DateTime, Utc};

/// Storage for pending login attempts.
pub trait OAuthStateStore: Send + Sync {
    /// Insert a new unused state.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StorageUnavailable` if the insert fails.
    fn insert_state(
        &self,
        state: NewOauthState,
    ) -> impl std::future::Future<Output = Result<OauthState>> + Send;

    /// Find a state by its token, used or not.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StorageUnavailable` if the query fails.
    fn find_state(
        &self,
        state_token: &str,
    ) -> impl std::future::Future<Output = Result<Option<OauthState>>> + Send;

    /// Claim an unused, unclaimed state for one in-flight login.
    ///
    /// Returns `false` if the state is used or already claimed. Must be
    /// atomic: of two concurrent claims at most one succeeds.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StorageUnavailable` if the update fails.
    fn claim_state(&self, id: i64) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Drop the claim of a login that failed, so the state can be retried.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StorageUnavailable` if the update fails.
    fn release_state(&self, id: i64) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Mark a state as consumed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StorageUnavailable` if the update fails.
    fn mark_state_used(&self, id: i64) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Append-only audit logs of issued tokens.
pub trait TokenAuditLog: Send + Sync {
    /// Record the provider tokens obtained by a login.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StorageUnavailable` if the insert fails.
    fn record_oauth_tokens(
        &self,
        tokens: NewOauthTokens,
    ) -> impl std::future::Future<Output = Result<OauthTokens>> + Send;

    /// Record a signed access token.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StorageUnavailable` if the insert fails.
    fn record_user_token(
        &self,
        token: NewUserToken,
    ) -> impl std::future::Future<Output = Result<UserToken>> + Send;
}

/// Per-account session rows.
///
/// # Implementation Notes
///
/// - At most one row per `account_id`
/// - `upsert_for_account` must be atomic against concurrent calls for the
///   same account (row lock plus unique index)
/// - `rotate` is a compare-and-swap on the current value
pub trait RefreshTokenStore: Send + Sync {
    /// Find the session currently holding `value`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StorageUnavailable` if the query fails.
    fn find_by_value(
        &self,
        value: &str,
    ) -> impl std::future::Future<Output = Result<Option<RefreshToken>>> + Send;

    /// Insert the account's session row, or overwrite its value in place.
    ///
    /// An existing row is reactivated: `is_logged_out` is cleared and
    /// `logout_at` reset.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StorageUnavailable` if the transaction fails.
    fn upsert_for_account(
        &self,
        account_id: &str,
        value: &str,
        user_agent: Option<&str>,
    ) -> impl std::future::Future<Output = Result<RefreshToken>> + Send;

    /// Replace the value of row `id` only if it still equals `expected`.
    ///
    /// Returns `false` when the row was rotated, logged out or removed in
    /// the meantime.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StorageUnavailable` if the update fails.
    fn rotate(
        &self,
        id: i64,
        expected: &str,
        new_value: &str,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Soft-delete a session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StorageUnavailable` if the update fails.
    fn mark_logged_out(
        &self,
        id: i64,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Read-only access to user profiles.
pub trait UserRepository: Send + Sync {
    /// Find a profile by external user id.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StorageUnavailable` if the query fails.
    fn find_user(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<User>>> + Send;
}

/// Everything the session service persists.
pub trait AccountStore: OAuthStateStore + TokenAuditLog + RefreshTokenStore + UserRepository {}

impl<T> AccountStore for T where T: OAuthStateStore + TokenAuditLog + RefreshTokenStore + UserRepository
{}
