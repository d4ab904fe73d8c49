//! Request span middleware.
//!
//! Each request runs inside an `http_request` span carrying a correlation ID
//! (from `X-Correlation-ID` when it is a UUID, generated otherwise) and an
//! empty `account_id` field the session service fills in once it knows the
//! account. The correlation ID is echoed in the response header.
//!
//! ```ignore
//! let app = Router::new()
//!     .nest("/api-private/v1/users", users)
//!     .layer(axum::middleware::from_fn(request_span));
//! ```

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Run the rest of the stack inside the request span.
///
/// Only the path is recorded: query strings carry state and refresh tokens.
pub async fn request_span(req: Request, next: Next) -> Response {
    let correlation_id = req
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let span = tracing::info_span!(
        "http_request",
        correlation_id = %correlation_id,
        method = %req.method(),
        path = %req.uri().path(),
        account_id = tracing::field::Empty,
    );

    let mut response = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }

    response
}
