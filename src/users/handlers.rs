use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, patch},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::dto::{PublicUser, UpdateUserRequest};
use crate::{
    auth::{extractors::AuthUser, repo_types::UserChanges},
    error::{AppError, AppResult},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(get_me))
        .route("/users/:id", patch(update_user))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<PublicUser>> {
    let user = state
        .sessions
        .store()
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, body))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(target_id): Path<i64>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> AppResult<Json<PublicUser>> {
    let Json(payload) = body?;
    if user_id != target_id {
        warn!(user_id, target_id, "attempt to edit another user");
        return Err(AppError::AccessDenied);
    }
    let payload = payload.validate()?;

    let password_hash = match &payload.password {
        Some(p) => Some(state.sessions.hasher().hash(p)?),
        None => None,
    };
    let changes = UserChanges {
        email: payload.email,
        name: payload.name.map(|n| n.trim().to_string()),
        password_hash,
    };

    let user = state
        .sessions
        .store()
        .update_profile(user_id, changes)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;
    info!(user_id, "profile updated");
    Ok(Json(user.into()))
}
