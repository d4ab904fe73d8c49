//! Custom Axum extractors.
//!
//! This module contains custom extractors for common HTTP patterns:
//! - `UserAgent`: Extract the User-Agent header, if any
//! - `BearerToken`: Extract the token of an `Authorization: Bearer` header
//!
//! # Examples
//!
//! ```ignore
//! use accounts_web::extractors::{BearerToken, UserAgent};
//!
//! async fn handler(
//!     UserAgent(user_agent): UserAgent,
//!     BearerToken(token): BearerToken,
//! ) -> Result<Json<Response>, AppError> {
//!     Ok(Json(response))
//! }
//! ```

use crate::error::AppError;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};

/// User-Agent header.
///
/// `None` when the header is absent, empty or not valid ASCII.
#[derive(Debug, Clone)]
pub struct UserAgent(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for UserAgent
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Self(user_agent))
    }
}

/// Bearer token from the `Authorization` header.
///
/// Rejects with 401 when the header is missing or uses another scheme.
/// The token itself is not validated here.
#[derive(Clone)]
pub struct BearerToken(pub String);

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(..)")
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing bearer token"))?;

        let token = value
            .split_once(' ')
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
            .map(|(_, token)| token.trim())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::unauthorized("Missing bearer token"))?;

        Ok(Self(token.to_string()))
    }
}
