//! Health check endpoint.
//!
//! Used by load balancers and monitoring systems to verify the process is up.

use axum::{http::StatusCode, Json};
use serde::Serialize;

/// Liveness response body.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Always `"ok"`.
    pub status: &'static str,
    /// Crate version of the running build.
    pub version: &'static str,
}

/// Simple health check endpoint (for basic liveness).
///
/// Does NOT check dependencies (database, OAuth provider).
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// { "status": "ok", "version": "0.1.0" }
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
