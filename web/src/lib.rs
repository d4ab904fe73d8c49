//! Axum plumbing for the accounts service.
//!
//! Domain crates map their errors into [`AppError`] and build routers with
//! the extractors and middleware defined here.
//!
//! # Request Flow
//!
//! 1. **`request_span`** tags the request and opens a tracing span
//! 2. **Extractors** pull query, headers and bearer token
//! 3. **Handler** calls the domain service
//! 4. **`AppError`** renders failures as `{code, message, status}`
//!
//! # Example
//!
//! ```ignore
//! use accounts_web::{AppError, request_span};
//! use axum::{middleware, routing::get, Router};
//!
//! let app = Router::new()
//!     .route("/health", get(accounts_web::handlers::health_check))
//!     .layer(middleware::from_fn(request_span));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{BearerToken, UserAgent};
pub use middleware::{request_span, CORRELATION_ID_HEADER};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
