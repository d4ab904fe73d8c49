//! Configuration management for the accounts server.
//!
//! Loads configuration from environment variables. Call `dotenvy::dotenv()`
//! first to pick up a local `.env` file.

use accounts_auth::constants::{
    DEFAULT_ACCESS_TOKEN_TTL_SECS, DEFAULT_UPSTREAM_TIMEOUT_SECS, MAX_ACCESS_TOKEN_TTL_SECS,
};
use std::env;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration loading failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set (or is empty).
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed or is out of range.
    #[error("Invalid value for {name}: {value:?}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },
}

/// Application configuration
#[derive(Clone)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// PostgreSQL configuration
    pub postgres: PostgresConfig,
    /// OAuth provider configuration
    pub oauth: OAuthConfig,
    /// Access token configuration
    pub token: TokenConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address, `host:port`
    pub bind_addr: String,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
}

/// PostgreSQL configuration
#[derive(Clone)]
pub struct PostgresConfig {
    /// Database URL
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
}

/// OAuth provider configuration
#[derive(Clone)]
pub struct OAuthConfig {
    /// Provider base URL (`/token` and `/me` hang off it)
    pub api_gateway: String,
    /// Client id
    pub client_id: String,
    /// Client secret
    pub client_secret: String,
    /// Redirect URI used when `/oauth/jump` omits one
    pub redirect_uri: String,
    /// Deadline for the upstream calls of one login, in seconds
    pub timeout_secs: u64,
}

/// Access token configuration
#[derive(Clone)]
pub struct TokenConfig {
    /// HS256 signing secret
    pub signing_secret: String,
    /// Access token lifetime in seconds
    pub access_token_ttl_secs: i64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or a
    /// numeric variable does not parse or is out of range. The access token
    /// lifetime must lie in `1..=MAX_ACCESS_TOKEN_TTL_SECS`; timeouts and the
    /// pool size must be positive.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        Ok(Self {
            server: ServerConfig {
                bind_addr: vars.or("BIND_ADDR", "0.0.0.0:8085"),
                shutdown_timeout: vars.parsed("SHUTDOWN_TIMEOUT", 30)?,
            },
            postgres: PostgresConfig {
                url: vars.required("DATABASE_URL")?,
                max_connections: vars.bounded("DATABASE_MAX_CONNECTIONS", 10, 1..=u32::MAX)?,
            },
            oauth: OAuthConfig {
                api_gateway: vars.required("API_GATEWAY")?,
                client_id: vars.required("OAUTH_CLIENT_ID")?,
                client_secret: vars.required("OAUTH_CLIENT_SECRET")?,
                redirect_uri: vars.or("OAUTH_REDIRECT_URI", ""),
                timeout_secs: vars.bounded(
                    "OAUTH_TIMEOUT_SECS",
                    DEFAULT_UPSTREAM_TIMEOUT_SECS,
                    1..=u64::MAX,
                )?,
            },
            token: TokenConfig {
                signing_secret: vars.required("TOKEN_SIGNING_SECRET")?,
                access_token_ttl_secs: vars.bounded(
                    "ACCESS_TOKEN_TTL_SECS",
                    DEFAULT_ACCESS_TOKEN_TTL_SECS,
                    1..=MAX_ACCESS_TOKEN_TTL_SECS,
                )?,
            },
        })
    }

    /// Upstream deadline as a [`Duration`].
    #[must_use]
    pub const fn oauth_timeout(&self) -> Duration {
        Duration::from_secs(self.oauth.timeout_secs)
    }

    /// Graceful shutdown timeout as a [`Duration`].
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout)
    }
}

// Secrets and the database URL (which may embed a password) stay out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.server.bind_addr)
            .field("shutdown_timeout", &self.server.shutdown_timeout)
            .field("max_connections", &self.postgres.max_connections)
            .field("api_gateway", &self.oauth.api_gateway)
            .field("client_id", &self.oauth.client_id)
            .field("redirect_uri", &self.oauth.redirect_uri)
            .field("oauth_timeout_secs", &self.oauth.timeout_secs)
            .field("access_token_ttl_secs", &self.token.access_token_ttl_secs)
            .finish_non_exhaustive()
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|value| !value.is_empty())
    }

    fn or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.get(name).ok_or(ConfigError::Missing(name))
    }

    fn parsed<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match self.get(name) {
            None => Ok(default),
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value }),
        }
    }

    fn bounded<T>(
        &self,
        name: &'static str,
        default: T,
        range: RangeInclusive<T>,
    ) -> Result<T, ConfigError>
    where
        T: FromStr + PartialOrd + ToString,
    {
        let value = self.parsed(name, default)?;
        if range.contains(&value) {
            Ok(value)
        } else {
            Err(ConfigError::Invalid {
                name,
                value: value.to_string(),
            })
        }
    }
}
