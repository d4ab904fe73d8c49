//! Session router composition.
//!
//! Composes all session handlers into a single Axum router.

use crate::constants::API_BASE_PATH;
use crate::handlers::{oauth, session, user};
use crate::providers::{AccountStore, Clock, OAuthClient};
use crate::service::SessionService;
use accounts_web::{handlers::health_check, request_span};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Create the session router.
///
/// # Routes
///
/// ## OAuth
/// - `GET|POST /oauth/state` - Issue a state token
/// - `POST /oauth/jump` - Complete login with the authorization code
///
/// ## Session
/// - `POST /refresh-token` - Rotate refresh token
/// - `POST /logout` - Terminate session
///
/// ## User
/// - `GET /me` - Profile of the bearer token's account
///
/// # Example
///
/// ```rust,ignore
/// let app = Router::new()
///     .nest("/api-private/v1/users", session_router(Arc::new(service)))
///     .layer(TraceLayer::new_for_http());
/// ```
pub fn session_router<S, O, C>(service: Arc<SessionService<S, O, C>>) -> Router
where
    S: AccountStore + 'static,
    O: OAuthClient + 'static,
    C: Clock + 'static,
{
    Router::new()
        // OAuth routes
        .route(
            "/oauth/state",
            get(oauth::oauth_state::<S, O, C>).post(oauth::oauth_state::<S, O, C>),
        )
        .route("/oauth/jump", post(oauth::oauth_jump::<S, O, C>))
        // Session routes
        .route("/refresh-token", post(session::refresh_token::<S, O, C>))
        .route("/logout", post(session::logout::<S, O, C>))
        // User routes
        .route("/me", get(user::me::<S, O, C>))
        .with_state(service)
}

/// Full API: `/health` plus the session routes under the base path, with
/// every request inside a correlated span.
pub fn api_router<S, O, C>(service: Arc<SessionService<S, O, C>>) -> Router
where
    S: AccountStore + 'static,
    O: OAuthClient + 'static,
    C: Clock + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .nest(API_BASE_PATH, session_router(service))
        .layer(middleware::from_fn(request_span))
}
