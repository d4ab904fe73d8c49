//! Session service.
//!
//! Turns a one-time `(state, authorization_code)` pair into an internal
//! session, rotates refresh tokens and terminates sessions.
//!
//! # Login flow
//!
//! ```text
//! begin_login ──► OauthState(used=false) ──► state token to client
//!                                                │
//!                      provider redirect with code + state
//!                                                ▼
//! complete_login:
//!   1. claim unused state         ─► InvalidState
//!   2. exchange code              ─► UpstreamExchangeFailed / UpstreamTimeout
//!   3. resolve account id         ─► UpstreamIdentityFailed / UpstreamTimeout
//!   4. audit provider tokens
//!   5. sign access token, audit it
//!   6. upsert the account's refresh token (one row per account)
//!   7. mark state used            (failure only logged)
//! ```
//!
//! Steps run strictly in this order. A failing step aborts the login;
//! writes of earlier steps stay committed and the state claim is released.
//! The claim is what keeps two concurrent logins on one state from both
//! being granted.

use crate::config::SessionConfig;
use crate::environment::SessionEnvironment;
use crate::error::{Result, SessionError};
use crate::providers::{AccountStore, Clock, OAuthClient};
use crate::records::{
    LoginOutcome, NewOauthState, NewOauthTokens, NewUserToken, TokenPair, UserInfo,
};
use crate::signer::TokenSigner;
use crate::utils::generate_opaque_token;
use std::future::Future;
use tokio::time::Instant;

/// Login, refresh and logout over injected collaborators.
///
/// Holds no mutable state; every call can run concurrently with any other.
#[derive(Debug, Clone)]
pub struct SessionService<S, O, C>
where
    S: AccountStore,
    O: OAuthClient,
    C: Clock,
{
    env: SessionEnvironment<S, O, C>,
    signer: TokenSigner,
    config: SessionConfig,
}

impl<S, O, C> SessionService<S, O, C>
where
    S: AccountStore,
    O: OAuthClient,
    C: Clock,
{
    /// Create a session service.
    #[must_use]
    pub const fn new(
        env: SessionEnvironment<S, O, C>,
        signer: TokenSigner,
        config: SessionConfig,
    ) -> Self {
        Self {
            env,
            signer,
            config,
        }
    }

    /// Injected collaborators.
    #[must_use]
    pub const fn environment(&self) -> &SessionEnvironment<S, O, C> {
        &self.env
    }

    /// Access token signer.
    #[must_use]
    pub const fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// Issue a state token for a new login attempt.
    ///
    /// `query_string` is opaque and handed back unchanged by
    /// [`complete_login`](Self::complete_login).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::StorageUnavailable`] if the state cannot be stored.
    pub async fn begin_login(&self, query_string: &str) -> Result<String> {
        let state_token = generate_opaque_token();

        let state = self
            .env
            .store
            .insert_state(NewOauthState {
                state_token: state_token.clone(),
                query_string: query_string.to_string(),
            })
            .await?;

        tracing::info!(state_id = state.id, "OAuth state issued");

        Ok(state_token)
    }

    /// Complete an OAuth login.
    ///
    /// `redirect_uri` falls back to the configured default when absent or
    /// empty. `user_agent` is recorded on the session row.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidState`]: state unknown or already used
    /// - [`SessionError::UpstreamExchangeFailed`]: provider rejected the code
    /// - [`SessionError::UpstreamIdentityFailed`]: provider resolved no account
    /// - [`SessionError::UpstreamTimeout`]: provider missed the deadline
    /// - [`SessionError::StorageUnavailable`]: any persistence failure
    /// - [`SessionError::TokenSigningFailed`]: access token could not be signed
    pub async fn complete_login(
        &self,
        redirect_uri: Option<&str>,
        authorization_code: &str,
        state: &str,
        user_agent: Option<&str>,
    ) -> Result<LoginOutcome> {
        // One deadline covers every upstream call of this login.
        let deadline = Instant::now() + self.config.upstream_timeout;

        // 1. State must exist, be unused, and not be held by another login
        let oauth_state = match self.env.store.find_state(state).await? {
            Some(found) if !found.used && !found.claimed => found,
            Some(found) => {
                tracing::warn!(state_id = found.id, used = found.used, "Rejected consumed OAuth state");
                return Err(SessionError::InvalidState);
            }
            None => {
                tracing::warn!("Rejected unknown OAuth state");
                return Err(SessionError::InvalidState);
            }
        };

        if !self.env.store.claim_state(oauth_state.id).await? {
            tracing::warn!(state_id = oauth_state.id, "OAuth state claimed by a concurrent login");
            return Err(SessionError::InvalidState);
        }

        // 2-6. On failure the claim is dropped so the user can retry
        let granted = self
            .grant_session(deadline, redirect_uri, authorization_code, user_agent)
            .await;

        let (account_id, token) = match granted {
            Ok(granted) => granted,
            Err(e) => {
                if let Err(release) = self.env.store.release_state(oauth_state.id).await {
                    tracing::warn!(
                        state_id = oauth_state.id,
                        error = %release,
                        "Failed to release OAuth state"
                    );
                }
                return Err(e);
            }
        };

        // 7. Best effort; the session is already granted and the claim
        //    keeps the state from being replayed
        if let Err(e) = self.env.store.mark_state_used(oauth_state.id).await {
            tracing::warn!(state_id = oauth_state.id, error = %e, "Failed to mark OAuth state used");
        }

        tracing::info!(account_id = %account_id, "OAuth login completed");

        Ok(LoginOutcome {
            account_id,
            token,
            query_string: oauth_state.query_string,
        })
    }

    /// Steps 2 to 6 of a login: exchange, identity, audit, tokens, session row.
    async fn grant_session(
        &self,
        deadline: Instant,
        redirect_uri: Option<&str>,
        authorization_code: &str,
        user_agent: Option<&str>,
    ) -> Result<(String, TokenPair)> {
        // 2. Exchange code
        let redirect_uri = redirect_uri
            .filter(|uri| !uri.is_empty())
            .unwrap_or(&self.config.default_redirect_uri);

        let external = with_deadline(
            deadline,
            self.env.oauth.exchange_code(authorization_code, redirect_uri),
        )
        .await
        .inspect_err(|e| tracing::error!(error = %e, "OAuth code exchange failed"))?;

        // 3. Resolve account
        let account_id = with_deadline(deadline, self.env.oauth.account_id(&external.access_token))
            .await
            .inspect_err(|e| tracing::error!(error = %e, "OAuth identity lookup failed"))?;

        if account_id.is_empty() {
            tracing::error!("OAuth provider returned an empty account id");
            return Err(SessionError::UpstreamIdentityFailed(
                "empty account id".to_string(),
            ));
        }
        record_account(&account_id);

        // 4. Audit provider tokens
        self.env
            .store
            .record_oauth_tokens(NewOauthTokens {
                account_id: account_id.clone(),
                authorization_code: authorization_code.to_string(),
                external_access_token: external.access_token,
                external_refresh_token: external.refresh_token,
            })
            .await?;

        // 5. Access token, audited before the session row is touched
        let access_token = self.issue_access_token(&account_id).await?;

        // 6. Rotation point: one row per account
        let refresh_token = generate_opaque_token();
        self.env
            .store
            .upsert_for_account(&account_id, &refresh_token, user_agent)
            .await?;

        Ok((
            account_id,
            TokenPair {
                access_token,
                refresh_token,
            },
        ))
    }

    /// Exchange a refresh token for a new token pair.
    ///
    /// The presented value is single-use: on success it is overwritten and
    /// any later use fails.
    ///
    /// # Errors
    ///
    /// - [`SessionError::SessionNotFound`]: value unknown or already rotated
    /// - [`SessionError::SessionLoggedOut`]: session was terminated
    /// - [`SessionError::StorageUnavailable`]: any persistence failure
    /// - [`SessionError::TokenSigningFailed`]: access token could not be signed
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let Some(session) = self.env.store.find_by_value(refresh_token).await? else {
            tracing::warn!("Refresh with unknown or rotated token");
            return Err(SessionError::SessionNotFound);
        };

        record_account(&session.account_id);

        if session.is_logged_out {
            tracing::warn!(account_id = %session.account_id, "Refresh on logged out session");
            return Err(SessionError::SessionLoggedOut);
        }

        let access_token = self.issue_access_token(&session.account_id).await?;

        let new_refresh_token = generate_opaque_token();
        let rotated = self
            .env
            .store
            .rotate(session.id, refresh_token, &new_refresh_token)
            .await?;

        if !rotated {
            // Lost a race against another refresh or a logout.
            tracing::warn!(account_id = %session.account_id, "Refresh token rotated concurrently");
            return match self.env.store.find_by_value(refresh_token).await? {
                Some(current) if current.is_logged_out => Err(SessionError::SessionLoggedOut),
                _ => Err(SessionError::SessionNotFound),
            };
        }

        tracing::info!(account_id = %session.account_id, "Refresh token rotated");

        Ok(TokenPair {
            access_token,
            refresh_token: new_refresh_token,
        })
    }

    /// Terminate the session holding `refresh_token`.
    ///
    /// Idempotent: an unknown or already logged out session succeeds. The
    /// access token is only checked for consistency; issued access tokens
    /// stay valid until they expire.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::StorageUnavailable`] if persistence fails.
    pub async fn logout(&self, access_token: Option<&str>, refresh_token: &str) -> Result<()> {
        let Some(session) = self.env.store.find_by_value(refresh_token).await? else {
            tracing::debug!("Logout for unknown session, nothing to do");
            return Ok(());
        };
        record_account(&session.account_id);

        if let Some(token) = access_token.filter(|t| !t.is_empty()) {
            match self.signer.verify(token) {
                Ok(claims) if claims.sub != session.account_id => {
                    tracing::warn!(
                        account_id = %session.account_id,
                        "Logout access token belongs to another account"
                    );
                }
                Ok(_) => {}
                Err(_) => tracing::debug!("Logout with unverifiable access token"),
            }
        }

        if session.is_logged_out {
            return Ok(());
        }

        self.env
            .store
            .mark_logged_out(session.id, self.env.clock.now())
            .await?;

        tracing::info!(account_id = %session.account_id, "Session logged out");

        Ok(())
    }

    /// Verify an access token and return its subject.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidAccessToken`] if verification fails.
    pub fn authenticate(&self, access_token: &str) -> Result<String> {
        self.signer.verify(access_token).map(|claims| claims.sub)
    }

    /// Profile of the account that owns `access_token`.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidAccessToken`]: token fails verification
    /// - [`SessionError::UserNotFound`]: no profile for the subject
    /// - [`SessionError::StorageUnavailable`]: query failed
    pub async fn user_info(&self, access_token: &str) -> Result<UserInfo> {
        let user_id = self.authenticate(access_token)?;
        record_account(&user_id);

        self.env
            .store
            .find_user(&user_id)
            .await?
            .map(UserInfo::from)
            .ok_or(SessionError::UserNotFound)
    }

    /// Sign an access token for `account_id` and append it to the audit log.
    async fn issue_access_token(&self, account_id: &str) -> Result<String> {
        let signed = self.signer.sign(account_id, self.env.clock.now())?;

        self.env
            .store
            .record_user_token(NewUserToken {
                account_id: account_id.to_string(),
                token_value: signed.value.clone(),
                expires_at: signed.expires_at,
            })
            .await?;

        Ok(signed.value)
    }
}

/// Fill the `account_id` field of the enclosing request span, if it has one.
fn record_account(account_id: &str) {
    tracing::Span::current().record("account_id", account_id);
}

/// Run an upstream call under the login deadline.
async fn with_deadline<T>(deadline: Instant, call: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout_at(deadline, call)
        .await
        .map_err(|_| SessionError::UpstreamTimeout)?
}
