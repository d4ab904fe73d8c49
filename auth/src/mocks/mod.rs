//! Mock provider implementations for testing.
//!
//! This module provides simple, in-memory implementations of all provider traits
//! for use in unit and integration tests.

pub mod clock;
pub mod oauth;
pub mod store;

pub use clock::FixedClock;
pub use oauth::MockOAuthClient;
pub use store::MockAccountStore;
