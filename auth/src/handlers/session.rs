//! Refresh and logout handlers.

use super::required;
use crate::providers::{AccountStore, Clock, OAuthClient};
use crate::records::TokenPair;
use crate::service::SessionService;
use accounts_web::WebResult;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

/// Refresh token carried in the body or the query.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenParams {
    /// Current refresh token.
    pub refresh_token: Option<String>,
}

/// Query of the logout endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutQuery {
    /// Access token of the session (optional).
    pub token: Option<String>,

    /// Refresh token of the session.
    pub refresh_token: Option<String>,
}

/// Rotate a refresh token.
///
/// # Endpoint
///
/// ```text
/// POST /refresh-token
/// Content-Type: application/json
///
/// { "refreshToken": "..." }
/// ```
///
/// `?refreshToken=...` is accepted when there is no body.
///
/// # Response
///
/// ```json
/// { "accessToken": "...", "refreshToken": "..." }
/// ```
pub async fn refresh_token<S, O, C>(
    State(service): State<Arc<SessionService<S, O, C>>>,
    Query(query): Query<RefreshTokenParams>,
    body: Option<Json<RefreshTokenParams>>,
) -> WebResult<Json<TokenPair>>
where
    S: AccountStore + 'static,
    O: OAuthClient + 'static,
    C: Clock + 'static,
{
    let presented = body
        .and_then(|Json(params)| params.refresh_token)
        .or(query.refresh_token);
    let refresh_token = required(presented, "refreshToken")?;

    let pair = service.refresh(&refresh_token).await?;
    Ok(Json(pair))
}

/// Terminate a session.
///
/// # Endpoint
///
/// ```text
/// POST /logout?token=...&refreshToken=...
/// ```
///
/// # Response
///
/// Empty 200, also when the session was unknown or already logged out.
pub async fn logout<S, O, C>(
    State(service): State<Arc<SessionService<S, O, C>>>,
    Query(query): Query<LogoutQuery>,
) -> WebResult<StatusCode>
where
    S: AccountStore + 'static,
    O: OAuthClient + 'static,
    C: Clock + 'static,
{
    let refresh_token = required(query.refresh_token, "refreshToken")?;

    service
        .logout(query.token.as_deref(), &refresh_token)
        .await?;

    Ok(StatusCode::OK)
}
