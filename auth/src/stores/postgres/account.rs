//! PostgreSQL account store implementation.
//!
//! One store covers every table the session service writes: login state,
//! the two token audit logs, per-account sessions and (read-only) profiles.
//!
//! # Example
//!
//! ```no_run
//! use accounts_auth::stores::postgres::PostgresAccountStore;
//! use sqlx::PgPool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PgPool::connect("postgresql://localhost/accounts").await?;
//! let store = PostgresAccountStore::new(pool);
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, SessionError};
use crate::providers::{OAuthStateStore, RefreshTokenStore, TokenAuditLog, UserRepository};
use crate::records::{
    NewOauthState, NewOauthTokens, NewUserToken, OauthState, OauthTokens, RefreshToken, User,
    UserToken,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

const REFRESH_TOKEN_COLUMNS: &str = "id, account_id, refresh_token_value, is_logged_out, \
     logout_at, user_agent, created_at, updated_at";

/// PostgreSQL account store.
#[derive(Debug, Clone)]
pub struct PostgresAccountStore {
    /// PostgreSQL connection pool.
    pool: PgPool,
}

impl PostgresAccountStore {
    /// Create a new PostgreSQL account store.
    ///
    /// # Arguments
    ///
    /// * `pool` - PostgreSQL connection pool
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns error if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| SessionError::StorageUnavailable(format!("Migration failed: {e}")))?;
        Ok(())
    }
}

impl OAuthStateStore for PostgresAccountStore {
    async fn insert_state(&self, state: NewOauthState) -> Result<OauthState> {
        sqlx::query_as::<_, OauthState>(
            r"
            INSERT INTO oauth_state (state_token, query_string)
            VALUES ($1, $2)
            RETURNING id, state_token, used, claimed, query_string, created_at, updated_at
            ",
        )
        .bind(&state.state_token)
        .bind(&state.query_string)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| SessionError::StorageUnavailable(format!("Failed to insert oauth state: {e}")))
    }

    async fn find_state(&self, state_token: &str) -> Result<Option<OauthState>> {
        sqlx::query_as::<_, OauthState>(
            r"
            SELECT id, state_token, used, claimed, query_string, created_at, updated_at
            FROM oauth_state
            WHERE state_token = $1
            ",
        )
        .bind(state_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SessionError::StorageUnavailable(format!("Failed to get oauth state: {e}")))
    }

    async fn claim_state(&self, id: i64) -> Result<bool> {
        // Conditional update: the row lock serializes concurrent claims and
        // the loser re-evaluates the WHERE clause and matches nothing.
        let result = sqlx::query(
            r"
            UPDATE oauth_state
            SET claimed = TRUE, updated_at = now()
            WHERE id = $1 AND NOT used AND NOT claimed
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::StorageUnavailable(format!("Failed to claim oauth state: {e}")))?;

        Ok(result.rows_affected() == 1)
    }

    async fn release_state(&self, id: i64) -> Result<()> {
        sqlx::query(
            r"
            UPDATE oauth_state
            SET claimed = FALSE, updated_at = now()
            WHERE id = $1 AND NOT used
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            SessionError::StorageUnavailable(format!("Failed to release oauth state: {e}"))
        })?;

        Ok(())
    }

    async fn mark_state_used(&self, id: i64) -> Result<()> {
        sqlx::query(
            r"
            UPDATE oauth_state
            SET used = TRUE, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            SessionError::StorageUnavailable(format!("Failed to mark oauth state used: {e}"))
        })?;

        Ok(())
    }
}

impl TokenAuditLog for PostgresAccountStore {
    async fn record_oauth_tokens(&self, tokens: NewOauthTokens) -> Result<OauthTokens> {
        sqlx::query_as::<_, OauthTokens>(
            r"
            INSERT INTO oauth_tokens
                (account_id, authorization_code, external_access_token, external_refresh_token)
            VALUES ($1, $2, $3, $4)
            RETURNING id, account_id, authorization_code, external_access_token,
                      external_refresh_token, created_at, updated_at
            ",
        )
        .bind(&tokens.account_id)
        .bind(&tokens.authorization_code)
        .bind(&tokens.external_access_token)
        .bind(&tokens.external_refresh_token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| SessionError::StorageUnavailable(format!("Failed to insert oauth tokens: {e}")))
    }

    async fn record_user_token(&self, token: NewUserToken) -> Result<UserToken> {
        sqlx::query_as::<_, UserToken>(
            r"
            INSERT INTO user_token (account_id, token_value, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, account_id, token_value, expires_at, created_at
            ",
        )
        .bind(&token.account_id)
        .bind(&token.token_value)
        .bind(token.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| SessionError::StorageUnavailable(format!("Failed to insert user token: {e}")))
    }
}

impl RefreshTokenStore for PostgresAccountStore {
    async fn find_by_value(&self, value: &str) -> Result<Option<RefreshToken>> {
        sqlx::query_as::<_, RefreshToken>(&format!(
            "SELECT {REFRESH_TOKEN_COLUMNS} FROM refresh_token WHERE refresh_token_value = $1"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SessionError::StorageUnavailable(format!("Failed to get refresh token: {e}")))
    }

    async fn upsert_for_account(
        &self,
        account_id: &str,
        value: &str,
        user_agent: Option<&str>,
    ) -> Result<RefreshToken> {
        // Transaction flow (READ COMMITTED, the PostgreSQL default):
        // 1. SELECT ... FOR UPDATE locks an existing row; a concurrent login
        //    for the same account blocks here until we commit
        // 2. UPDATE in place, or INSERT when no row exists
        // 3. Two first-time logins both see no row; the unique index on
        //    account_id turns the loser's INSERT into an UPDATE
        let mut tx = self.pool.begin().await.map_err(|e| {
            SessionError::StorageUnavailable(format!("Failed to start transaction: {e}"))
        })?;

        let existing: Option<i64> = sqlx::query_scalar(
            r"
            SELECT id
            FROM refresh_token
            WHERE account_id = $1
            FOR UPDATE
            ",
        )
        .bind(account_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| SessionError::StorageUnavailable(format!("Failed to lock refresh token: {e}")))?;

        let row = if let Some(id) = existing {
            sqlx::query_as::<_, RefreshToken>(&format!(
                "UPDATE refresh_token
                 SET refresh_token_value = $2, is_logged_out = FALSE, logout_at = NULL,
                     user_agent = $3, updated_at = now()
                 WHERE id = $1
                 RETURNING {REFRESH_TOKEN_COLUMNS}"
            ))
            .bind(id)
            .bind(value)
            .bind(user_agent)
            .fetch_one(&mut *tx)
            .await
        } else {
            sqlx::query_as::<_, RefreshToken>(&format!(
                "INSERT INTO refresh_token (account_id, refresh_token_value, user_agent)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (account_id) DO UPDATE
                 SET refresh_token_value = EXCLUDED.refresh_token_value,
                     is_logged_out = FALSE, logout_at = NULL,
                     user_agent = EXCLUDED.user_agent, updated_at = now()
                 RETURNING {REFRESH_TOKEN_COLUMNS}"
            ))
            .bind(account_id)
            .bind(value)
            .bind(user_agent)
            .fetch_one(&mut *tx)
            .await
        }
        .map_err(|e| SessionError::StorageUnavailable(format!("Failed to upsert refresh token: {e}")))?;

        tx.commit().await.map_err(|e| {
            SessionError::StorageUnavailable(format!("Failed to commit transaction: {e}"))
        })?;

        Ok(row)
    }

    async fn rotate(&self, id: i64, expected: &str, new_value: &str) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE refresh_token
            SET refresh_token_value = $3, updated_at = now()
            WHERE id = $1 AND refresh_token_value = $2 AND NOT is_logged_out
            ",
        )
        .bind(id)
        .bind(expected)
        .bind(new_value)
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::StorageUnavailable(format!("Failed to rotate refresh token: {e}")))?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_logged_out(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r"
            UPDATE refresh_token
            SET is_logged_out = TRUE, logout_at = $2, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::StorageUnavailable(format!("Failed to log out session: {e}")))?;

        Ok(())
    }
}

impl UserRepository for PostgresAccountStore {
    async fn find_user(&self, user_id: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r"
            SELECT id, user_id, name, icon, created_at, updated_at
            FROM users
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SessionError::StorageUnavailable(format!("Failed to get user: {e}")))
    }
}
