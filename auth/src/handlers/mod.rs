//! HTTP handlers for the session endpoints.
//!
//! Handlers only translate between wire parameters and [`SessionService`]
//! calls; every decision is made by the service.
//!
//! [`SessionService`]: crate::service::SessionService

pub mod oauth;
pub mod session;
pub mod user;

use crate::error::SessionError;
use accounts_web::{AppError, WebResult};

/// Message shown for every upstream failure; detail stays in server logs.
const LOGIN_FAILED_MESSAGE: &str = "login failed, please retry";

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        let code = err.code();

        let app = match &err {
            SessionError::InvalidState => {
                Self::bad_request("Invalid or expired login state, please restart login")
            }
            SessionError::UpstreamTimeout => Self::gateway_timeout(LOGIN_FAILED_MESSAGE),
            SessionError::UpstreamExchangeFailed(_) | SessionError::UpstreamIdentityFailed(_) => {
                Self::bad_gateway(LOGIN_FAILED_MESSAGE)
            }
            SessionError::SessionNotFound
            | SessionError::SessionLoggedOut
            | SessionError::InvalidAccessToken => Self::unauthorized(err.to_string()),
            SessionError::UserNotFound => Self::not_found(err.to_string()),
            SessionError::StorageUnavailable(_) => {
                Self::unavailable("Service temporarily unavailable")
            }
            SessionError::TokenSigningFailed(_) => Self::internal("An internal error occurred"),
        }
        .with_code(code);

        // Detail of server-side failures goes to the log only
        if app.status().is_server_error() {
            app.with_source(anyhow::Error::new(err))
        } else {
            app
        }
    }
}

/// Require a non-empty parameter.
fn required(value: Option<String>, name: &str) -> WebResult<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::bad_request(format!("{name} is required")))
}
