//! Session environment.
//!
//! This module defines the environment type for dependency injection
//! into the session service.

use crate::providers::{AccountStore, Clock, OAuthClient};

/// Session environment.
///
/// Contains all external dependencies needed by the session service.
///
/// # Type Parameters
///
/// - `S`: Account store (state, audit logs, sessions, users)
/// - `O`: Remote `OAuth` client
/// - `C`: Clock
#[derive(Debug, Clone)]
pub struct SessionEnvironment<S, O, C>
where
    S: AccountStore,
    O: OAuthClient,
    C: Clock,
{
    /// Account store (`PostgreSQL`).
    pub store: S,

    /// Remote `OAuth` provider.
    pub oauth: O,

    /// Time source.
    pub clock: C,
}

impl<S, O, C> SessionEnvironment<S, O, C>
where
    S: AccountStore,
    O: OAuthClient,
    C: Clock,
{
    /// Create a new session environment.
    #[must_use]
    pub const fn new(store: S, oauth: O, clock: C) -> Self {
        Self {
            store,
            oauth,
            clock,
        }
    }
}
