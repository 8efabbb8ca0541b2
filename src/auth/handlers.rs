use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::CookieJar;
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, RegisterRequest, SessionResponse},
        extractors::AuthUser,
        services,
        session::SessionKeys,
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/session", get(session))
}

#[instrument(skip(state, jar, payload))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), AppError> {
    let Json(payload) = payload?;
    let user = services::register(state.users.as_ref(), payload).await?;

    let keys = SessionKeys::from_ref(&state);
    let token = keys.issue(user.id)?;

    Ok((
        StatusCode::CREATED,
        jar.add(keys.session_cookie(token)),
        Json(AuthResponse { user: user.into() }),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let Json(payload) = payload?;
    let user = services::authenticate(state.users.as_ref(), payload).await?;

    let keys = SessionKeys::from_ref(&state);
    let token = keys.issue(user.id)?;

    Ok((
        jar.add(keys.session_cookie(token)),
        Json(AuthResponse { user: user.into() }),
    ))
}

#[instrument(skip(state, jar))]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (StatusCode, CookieJar) {
    let keys = SessionKeys::from_ref(&state);
    info!("session cleared");
    (StatusCode::NO_CONTENT, jar.add(keys.cleared_cookie()))
}

/// Current user, or `null` when there is no valid session.
#[instrument(skip(state))]
pub async fn session(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
) -> Result<Json<SessionResponse>, AppError> {
    let user = match auth {
        Some(AuthUser(user_id)) => services::current_user(state.users.as_ref(), user_id).await?,
        None => None,
    };
    Ok(Json(SessionResponse {
        user: user.map(Into::into),
    }))
}
