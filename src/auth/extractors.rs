use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use axum_extra::extract::CookieJar;
use tracing::warn;
use uuid::Uuid;

use super::session::{SessionKeys, SESSION_COOKIE};
use crate::error::AppError;

/// Authenticated caller, resolved from the session cookie (or a Bearer token).
/// Use `Option<AuthUser>` where identity is optional.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(AppError::Unauthenticated)?;

        let keys = SessionKeys::from_ref(state);
        match keys.verify(&token) {
            Some(user_id) => Ok(AuthUser(user_id)),
            None => {
                warn!("invalid or expired session");
                Err(AppError::Unauthenticated)
            }
        }
    }
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(|t| t.trim().to_string())
}
