//! Storage implementations for the session service.
//!
//! - **Account Store** (`PostgreSQL`) - login state, token audit logs,
//!   per-account sessions and user profiles

#[cfg(feature = "postgres")]
pub mod postgres;

// Re-exports
#[cfg(feature = "postgres")]
pub use postgres::PostgresAccountStore;
