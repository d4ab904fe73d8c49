//! # Accounts Session Service
//!
//! OAuth login, refresh-token rotation and logout for the accounts service.
//!
//! ## Features
//!
//! - **Login**: one-time state token, provider code exchange, internal session
//! - **Rotation**: refresh tokens are single-use and overwritten on every use
//! - **Logout**: idempotent soft delete of the account's session
//! - **Testable**: every collaborator is a trait with an in-memory mock
//!
//! ## Architecture
//!
//! ```text
//! HTTP (handlers, feature "axum")
//!   → SessionService
//!       → AccountStore (PostgreSQL, feature "postgres")
//!       → OAuthClient  (HttpOAuthClient over reqwest)
//!       → TokenSigner  (HS256)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use accounts_auth::mocks::{FixedClock, MockAccountStore, MockOAuthClient};
//! use accounts_auth::{SessionConfig, SessionEnvironment, SessionService, TokenSigner};
//!
//! # tokio_test::block_on(async {
//! let oauth = MockOAuthClient::new().with_login("code123", "ext1", "acct-42");
//! let env = SessionEnvironment::new(MockAccountStore::new(), oauth, FixedClock::default());
//! let signer = TokenSigner::new(b"secret", chrono::Duration::hours(1));
//! let service = SessionService::new(env, signer, SessionConfig::default());
//!
//! let state = service.begin_login("return=/home").await?;
//! let outcome = service.complete_login(None, "code123", &state, None).await?;
//! assert_eq!(outcome.account_id, "acct-42");
//! assert_eq!(outcome.query_string, "return=/home");
//! # Ok::<(), accounts_auth::SessionError>(())
//! # }).unwrap();
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod config;
pub mod constants;
pub mod environment;
pub mod error;
pub mod providers;
pub mod records;
pub mod service;
pub mod signer;
pub mod stores;
pub mod utils;

// Mock providers for testing
#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// HTTP handlers (optional, requires axum feature)
#[cfg(feature = "axum")]
pub mod handlers;

#[cfg(feature = "axum")]
pub mod router;

// Re-export main types for convenience
pub use config::SessionConfig;
pub use environment::SessionEnvironment;
pub use error::{Result, SessionError};
pub use records::{LoginOutcome, TokenPair, UserInfo};
pub use service::SessionService;
pub use signer::{Claims, SignedToken, TokenSigner};

#[cfg(feature = "axum")]
pub use router::{api_router, session_router};
