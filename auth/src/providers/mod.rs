//! Session collaborators.
//!
//! This module defines traits for every external dependency of the session
//! service: persistence, the remote OAuth provider, and the clock. The
//! service depends only on these traits; the server wires in concrete
//! implementations.
//!
//! ```text
//! ┌────────────────────┐
//! │ SessionService     │
//! └──┬──────┬──────┬───┘
//!    │      │      │
//!    ▼      ▼      ▼
//! Account  OAuth  Clock
//! Store    Client
//!    │      │
//!    ▼      ▼
//! Postgres  HttpOAuthClient (reqwest)
//! ```
//!
//! This enables:
//! - **Testing**: in-memory mocks with scripted failures
//! - **Production**: `PostgreSQL` and the provider's HTTP API

pub mod clock;
pub mod oauth;
pub mod remote;
pub mod store;

pub use clock::{Clock, SystemClock};
pub use oauth::{ExternalTokens, OAuthClient};
pub use remote::HttpOAuthClient;
pub use store::{AccountStore, OAuthStateStore, RefreshTokenStore, TokenAuditLog, UserRepository};
