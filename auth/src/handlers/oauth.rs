//! OAuth login handlers.

use super::required;
use crate::providers::{AccountStore, Clock, OAuthClient};
use crate::records::LoginOutcome;
use crate::service::SessionService;
use accounts_web::{UserAgent, WebResult};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

/// Query of the state endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthStateQuery {
    /// Opaque value returned on completion (defaults to empty).
    #[serde(default)]
    pub query_string: String,
}

/// Query of the jump endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthJumpQuery {
    /// Authorization code from the provider.
    pub authorization_code: Option<String>,

    /// State token issued by the state endpoint.
    pub state: Option<String>,

    /// Redirect URI the code was issued for.
    pub redirect_uri: Option<String>,
}

/// Issue a state token for a new login.
///
/// # Endpoint
///
/// ```text
/// GET|POST /oauth/state?queryString=...
/// ```
///
/// # Response
///
/// The state token as a JSON string.
pub async fn oauth_state<S, O, C>(
    State(service): State<Arc<SessionService<S, O, C>>>,
    Query(query): Query<OAuthStateQuery>,
) -> WebResult<Json<String>>
where
    S: AccountStore + 'static,
    O: OAuthClient + 'static,
    C: Clock + 'static,
{
    let state = service.begin_login(&query.query_string).await?;
    Ok(Json(state))
}

/// Complete a login with the provider's authorization code.
///
/// # Endpoint
///
/// ```text
/// POST /oauth/jump?authorizationCode=...&state=...&redirectUri=...
/// ```
///
/// # Response
///
/// ```json
/// {
///   "accountId": "acct-42",
///   "token": { "accessToken": "...", "refreshToken": "..." },
///   "queryString": "return=/home"
/// }
/// ```
pub async fn oauth_jump<S, O, C>(
    State(service): State<Arc<SessionService<S, O, C>>>,
    user_agent: UserAgent,
    Query(query): Query<OAuthJumpQuery>,
) -> WebResult<Json<LoginOutcome>>
where
    S: AccountStore + 'static,
    O: OAuthClient + 'static,
    C: Clock + 'static,
{
    let authorization_code = required(query.authorization_code, "authorizationCode")?;
    let state = required(query.state, "state")?;

    let outcome = service
        .complete_login(
            query.redirect_uri.as_deref(),
            &authorization_code,
            &state,
            user_agent.0.as_deref(),
        )
        .await?;

    Ok(Json(outcome))
}
