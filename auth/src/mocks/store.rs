//! Mock account store for testing.

use crate::error::{Result, SessionError};
use crate::providers::{OAuthStateStore, RefreshTokenStore, TokenAuditLog, UserRepository};
use crate::records::{
    NewOauthState, NewOauthTokens, NewUserToken, OauthState, OauthTokens, RefreshToken, User,
    UserToken,
};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

/// Mock account store.
///
/// Uses in-memory storage for testing. Every write is appended to a write
/// log so tests can assert ordering.
#[derive(Debug, Clone, Default)]
pub struct MockAccountStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    states: Vec<OauthState>,
    oauth_tokens: Vec<OauthTokens>,
    user_tokens: Vec<UserToken>,
    refresh_tokens: Vec<RefreshToken>,
    users: Vec<User>,
    writes: Vec<&'static str>,
    unavailable: bool,
    fail_mark_state_used: bool,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable {
            return Err(SessionError::StorageUnavailable(
                "mock store unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

fn lock(inner: &Mutex<Inner>) -> Result<MutexGuard<'_, Inner>> {
    inner
        .lock()
        .map_err(|_| SessionError::StorageUnavailable("Mutex lock failed".to_string()))
}

impl MockAccountStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with `StorageUnavailable`.
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn set_unavailable(&self, unavailable: bool) -> Result<()> {
        lock(&self.inner)?.unavailable = unavailable;
        Ok(())
    }

    /// Make `mark_state_used` fail while everything else works.
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn set_fail_mark_state_used(&self, fail: bool) -> Result<()> {
        lock(&self.inner)?.fail_mark_state_used = fail;
        Ok(())
    }

    /// Seed a user profile.
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn insert_user(&self, user_id: &str, name: &str, icon: &str) -> Result<User> {
        let mut inner = lock(&self.inner)?;
        let now = Utc::now();
        let user = User {
            id: inner.next_id(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            icon: icon.to_string(),
            created_at: now,
            updated_at: now,
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    /// State row by token (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn state(&self, state_token: &str) -> Result<Option<OauthState>> {
        Ok(lock(&self.inner)?
            .states
            .iter()
            .find(|s| s.state_token == state_token)
            .cloned())
    }

    /// Session rows of an account (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn refresh_tokens_for(&self, account_id: &str) -> Result<Vec<RefreshToken>> {
        Ok(lock(&self.inner)?
            .refresh_tokens
            .iter()
            .filter(|r| r.account_id == account_id)
            .cloned()
            .collect())
    }

    /// Access token audit log (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn user_tokens(&self) -> Result<Vec<UserToken>> {
        Ok(lock(&self.inner)?.user_tokens.clone())
    }

    /// Provider token audit log (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn oauth_tokens(&self) -> Result<Vec<OauthTokens>> {
        Ok(lock(&self.inner)?.oauth_tokens.clone())
    }

    /// Names of the write operations performed, in order (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn writes(&self) -> Result<Vec<&'static str>> {
        Ok(lock(&self.inner)?.writes.clone())
    }
}

impl OAuthStateStore for MockAccountStore {
    fn insert_state(&self, state: NewOauthState) -> impl Future<Output = Result<OauthState>> + Send {
        let inner = Arc::clone(&self.inner);

        async move {
            let mut inner = lock(&inner)?;
            inner.check_available()?;

            let now = Utc::now();
            let row = OauthState {
                id: inner.next_id(),
                state_token: state.state_token,
                used: false,
                claimed: false,
                query_string: state.query_string,
                created_at: now,
                updated_at: now,
            };
            inner.states.push(row.clone());
            inner.writes.push("insert_state");
            Ok(row)
        }
    }

    fn find_state(
        &self,
        state_token: &str,
    ) -> impl Future<Output = Result<Option<OauthState>>> + Send {
        let inner = Arc::clone(&self.inner);
        let state_token = state_token.to_string();

        async move {
            let inner = lock(&inner)?;
            inner.check_available()?;

            Ok(inner
                .states
                .iter()
                .find(|s| s.state_token == state_token)
                .cloned())
        }
    }

    fn claim_state(&self, id: i64) -> impl Future<Output = Result<bool>> + Send {
        let inner = Arc::clone(&self.inner);

        async move {
            let mut inner = lock(&inner)?;
            inner.check_available()?;

            let Some(state) = inner
                .states
                .iter_mut()
                .find(|s| s.id == id && !s.used && !s.claimed)
            else {
                return Ok(false);
            };
            state.claimed = true;
            state.updated_at = Utc::now();
            inner.writes.push("claim_state");
            Ok(true)
        }
    }

    fn release_state(&self, id: i64) -> impl Future<Output = Result<()>> + Send {
        let inner = Arc::clone(&self.inner);

        async move {
            let mut inner = lock(&inner)?;
            inner.check_available()?;

            if let Some(state) = inner.states.iter_mut().find(|s| s.id == id && !s.used) {
                state.claimed = false;
                state.updated_at = Utc::now();
            }
            inner.writes.push("release_state");
            Ok(())
        }
    }

    fn mark_state_used(&self, id: i64) -> impl Future<Output = Result<()>> + Send {
        let inner = Arc::clone(&self.inner);

        async move {
            let mut inner = lock(&inner)?;
            inner.check_available()?;
            if inner.fail_mark_state_used {
                return Err(SessionError::StorageUnavailable(
                    "mark_state_used failed".to_string(),
                ));
            }

            if let Some(state) = inner.states.iter_mut().find(|s| s.id == id) {
                state.used = true;
                state.updated_at = Utc::now();
            }
            inner.writes.push("mark_state_used");
            Ok(())
        }
    }
}

impl TokenAuditLog for MockAccountStore {
    fn record_oauth_tokens(
        &self,
        tokens: NewOauthTokens,
    ) -> impl Future<Output = Result<OauthTokens>> + Send {
        let inner = Arc::clone(&self.inner);

        async move {
            let mut inner = lock(&inner)?;
            inner.check_available()?;

            let now = Utc::now();
            let row = OauthTokens {
                id: inner.next_id(),
                account_id: tokens.account_id,
                authorization_code: tokens.authorization_code,
                external_access_token: tokens.external_access_token,
                external_refresh_token: tokens.external_refresh_token,
                created_at: now,
                updated_at: now,
            };
            inner.oauth_tokens.push(row.clone());
            inner.writes.push("record_oauth_tokens");
            Ok(row)
        }
    }

    fn record_user_token(
        &self,
        token: NewUserToken,
    ) -> impl Future<Output = Result<UserToken>> + Send {
        let inner = Arc::clone(&self.inner);

        async move {
            let mut inner = lock(&inner)?;
            inner.check_available()?;

            let row = UserToken {
                id: inner.next_id(),
                account_id: token.account_id,
                token_value: token.token_value,
                expires_at: token.expires_at,
                created_at: Utc::now(),
            };
            inner.user_tokens.push(row.clone());
            inner.writes.push("record_user_token");
            Ok(row)
        }
    }
}

impl RefreshTokenStore for MockAccountStore {
    fn find_by_value(
        &self,
        value: &str,
    ) -> impl Future<Output = Result<Option<RefreshToken>>> + Send {
        let inner = Arc::clone(&self.inner);
        let value = value.to_string();

        async move {
            let inner = lock(&inner)?;
            inner.check_available()?;

            Ok(inner
                .refresh_tokens
                .iter()
                .find(|r| r.refresh_token_value == value)
                .cloned())
        }
    }

    fn upsert_for_account(
        &self,
        account_id: &str,
        value: &str,
        user_agent: Option<&str>,
    ) -> impl Future<Output = Result<RefreshToken>> + Send {
        let inner = Arc::clone(&self.inner);
        let account_id = account_id.to_string();
        let value = value.to_string();
        let user_agent = user_agent.map(str::to_string);

        async move {
            // Lookup and write happen under one lock, like the row lock in SQL.
            let mut inner = lock(&inner)?;
            inner.check_available()?;
            inner.writes.push("upsert_for_account");

            let now = Utc::now();
            if let Some(row) = inner
                .refresh_tokens
                .iter_mut()
                .find(|r| r.account_id == account_id)
            {
                row.refresh_token_value = value;
                row.is_logged_out = false;
                row.logout_at = None;
                row.user_agent = user_agent;
                row.updated_at = now;
                return Ok(row.clone());
            }

            let row = RefreshToken {
                id: inner.next_id(),
                account_id,
                refresh_token_value: value,
                is_logged_out: false,
                logout_at: None,
                user_agent,
                created_at: now,
                updated_at: now,
            };
            inner.refresh_tokens.push(row.clone());
            Ok(row)
        }
    }

    fn rotate(
        &self,
        id: i64,
        expected: &str,
        new_value: &str,
    ) -> impl Future<Output = Result<bool>> + Send {
        let inner = Arc::clone(&self.inner);
        let expected = expected.to_string();
        let new_value = new_value.to_string();

        async move {
            let mut inner = lock(&inner)?;
            inner.check_available()?;

            let Some(row) = inner.refresh_tokens.iter_mut().find(|r| {
                r.id == id && r.refresh_token_value == expected && !r.is_logged_out
            }) else {
                return Ok(false);
            };

            row.refresh_token_value = new_value;
            row.updated_at = Utc::now();
            inner.writes.push("rotate");
            Ok(true)
        }
    }

    fn mark_logged_out(
        &self,
        id: i64,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<()>> + Send {
        let inner = Arc::clone(&self.inner);

        async move {
            let mut inner = lock(&inner)?;
            inner.check_available()?;

            if let Some(row) = inner.refresh_tokens.iter_mut().find(|r| r.id == id) {
                row.is_logged_out = true;
                row.logout_at = Some(at);
                row.updated_at = Utc::now();
            }
            inner.writes.push("mark_logged_out");
            Ok(())
        }
    }
}

impl UserRepository for MockAccountStore {
    fn find_user(&self, user_id: &str) -> impl Future<Output = Result<Option<User>>> + Send {
        let inner = Arc::clone(&self.inner);
        let user_id = user_id.to_string();

        async move {
            let inner = lock(&inner)?;
            inner.check_available()?;

            Ok(inner.users.iter().find(|u| u.user_id == user_id).cloned())
        }
    }
}
