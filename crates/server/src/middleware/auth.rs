//! Authentication extractors.
//!
//! A request is authenticated by an `Authorization: Bearer <jwt>` header
//! whose access token verifies and whose session row is still live.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};

use crate::db::SessionRepository;
use crate::error::{AppError, set_sentry_user};
use crate::middleware::rate_limit::client_ip;
use crate::models::CurrentUser;
use crate::services::auth::ClientInfo;
use crate::state::AppState;

const TOKEN_MISSING: &str = "Authentication token is missing";
const TOKEN_MALFORMED: &str = "Invalid token format";
const SESSION_GONE: &str = "Session has expired. Please login again";

/// The token part of a bearer `Authorization` header.
///
/// Returns `Ok(None)` when the header is absent.
///
/// # Errors
///
/// Returns `Unauthorized` when the header is present but malformed.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::Unauthorized(TOKEN_MALFORMED.to_string()))?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(Some(token.trim()))
        }
        _ => Err(AppError::Unauthorized(TOKEN_MALFORMED.to_string())),
    }
}

async fn authenticate(state: &AppState, token: &str) -> Result<CurrentUser, AppError> {
    let claims = state.jwt().verify_access(token)?;

    let session = SessionRepository::new(state.pool())
        .touch_live(token)
        .await?
        .ok_or_else(|| AppError::Unauthorized(SESSION_GONE.to_string()))?;
    if session.user_id != claims.user_id {
        return Err(AppError::Unauthorized(SESSION_GONE.to_string()));
    }

    Ok(CurrentUser {
        id: claims.user_id,
        email: claims.email,
        username: claims.username,
        token: token.to_owned(),
    })
}

/// Extractor that requires a valid bearer token and live session.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?
            .ok_or_else(|| AppError::Unauthorized(TOKEN_MISSING.to_string()))?;

        let user = authenticate(state, token).await?;
        set_sentry_user(&user.id, Some(&user.email));
        Ok(Self(user))
    }
}

/// Extractor that resolves the caller when a usable token is sent.
///
/// Missing, malformed, expired or revoked tokens all yield `None`; the
/// request proceeds anonymously.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Ok(Some(token)) = bearer_token(&parts.headers) else {
            return Ok(Self(None));
        };

        match authenticate(state, token).await {
            Ok(user) => Ok(Self(Some(user))),
            Err(err) => {
                tracing::debug!(error = %err, "Ignoring unusable bearer token");
                Ok(Self(None))
            }
        }
    }
}

/// Extractor for the caller's IP address and user agent.
pub struct Client(pub ClientInfo);

impl<S> FromRequestParts<S> for Client
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(Self(ClientInfo {
            ip_address: client_ip(&parts.headers, peer).map(|ip| ip.to_string()),
            user_agent: parts
                .headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(String::from),
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(auth: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(auth));
        headers
    }

    #[test]
    fn test_bearer_token_absent() {
        assert!(bearer_token(&HeaderMap::new()).unwrap().is_none());
    }

    #[test]
    fn test_bearer_token_parsed() {
        let h = headers("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&h).unwrap(), Some("abc.def.ghi"));

        let h = headers("bearer abc");
        assert_eq!(bearer_token(&h).unwrap(), Some("abc"));
    }

    #[test]
    fn test_bearer_token_malformed() {
        for raw in ["Bearer", "abc.def.ghi", "Basic dXNlcjpwYXNz", "Bearer  "] {
            let err = bearer_token(&headers(raw)).unwrap_err();
            assert!(
                matches!(&err, AppError::Unauthorized(msg) if msg == "Invalid token format"),
                "{raw}"
            );
        }
    }
}
