use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    profiles::{
        dto::{normalize_username, ProfilePayload, ProfileQuery},
        repo_types::Profile,
        services::{self, Saved},
    },
    state::AppState,
};

/// Inline profile images travel inside the JSON body.
const WRITE_BODY_LIMIT: usize = 5 * 1024 * 1024;

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/profiles",
            get(get_profile).post(upsert_profile).put(update_profile),
        )
        .layer(DefaultBodyLimit::max(WRITE_BODY_LIMIT))
}

/// `?username=X` is public; `?mine=true` needs a session.
#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    query: Result<Query<ProfileQuery>, QueryRejection>,
) -> Result<Json<Profile>, AppError> {
    let Query(query) = query?;

    if query.mine {
        let AuthUser(user_id) = auth.ok_or(AppError::Unauthenticated)?;
        return Ok(Json(services::get_mine(state.profiles.as_ref(), user_id).await?));
    }

    let username = query
        .username
        .as_deref()
        .map(normalize_username)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::validation("Username is required"))?;
    Ok(Json(
        services::get_public(state.profiles.as_ref(), &username).await?,
    ))
}

#[instrument(skip(state, payload))]
pub async fn upsert_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<ProfilePayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Profile>), AppError> {
    let Json(payload) = payload?;
    let draft = payload.into_draft()?;
    match services::upsert(state.profiles.as_ref(), user_id, draft).await? {
        Saved::Created(p) => Ok((StatusCode::CREATED, Json(p))),
        Saved::Updated(p) => Ok((StatusCode::OK, Json(p))),
    }
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<ProfilePayload>, JsonRejection>,
) -> Result<Json<Profile>, AppError> {
    let Json(payload) = payload?;
    let draft = payload.into_draft()?;
    Ok(Json(
        services::update(state.profiles.as_ref(), user_id, draft).await?,
    ))
}
