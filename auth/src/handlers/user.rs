//! Profile handler.

use crate::providers::{AccountStore, Clock, OAuthClient};
use crate::records::UserInfo;
use crate::service::SessionService;
use accounts_web::{BearerToken, WebResult};
use axum::{extract::State, Json};
use std::sync::Arc;

/// Profile of the authenticated account.
///
/// # Endpoint
///
/// ```text
/// GET /me
/// Authorization: Bearer <access token>
/// ```
///
/// # Response
///
/// ```json
/// { "userId": "acct-42", "name": "Mars", "icon": "https://..." }
/// ```
pub async fn me<S, O, C>(
    State(service): State<Arc<SessionService<S, O, C>>>,
    BearerToken(token): BearerToken,
) -> WebResult<Json<UserInfo>>
where
    S: AccountStore + 'static,
    O: OAuthClient + 'static,
    C: Clock + 'static,
{
    let info = service.user_info(&token).await?;
    Ok(Json(info))
}
