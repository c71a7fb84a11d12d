use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{patch, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{CreateCommentRequest, UpdateCommentRequest},
    repo_types::Comment,
    services,
};
use crate::{auth::extractors::AuthUser, error::AppResult, state::AppState};

pub fn comment_routes() -> Router<AppState> {
    Router::new()
        .route("/comments", post(create_comment))
        .route("/comments/:id", patch(update_comment).delete(delete_comment))
}

#[instrument(skip(state, body))]
pub async fn create_comment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    body: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let Json(payload) = body?;
    let (post_id, description) = payload.validate()?;
    let comment = services::create_comment(&state, user_id, post_id, &description).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[instrument(skip(state, body))]
pub async fn update_comment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
    body: Result<Json<UpdateCommentRequest>, JsonRejection>,
) -> AppResult<Json<Comment>> {
    let Json(payload) = body?;
    let description = payload.validate()?;
    let comment = services::update_comment(&state, id, user_id, &description).await?;
    Ok(Json(comment))
}

#[instrument(skip(state))]
pub async fn delete_comment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    Ok(Json(services::delete_comment(&state, id, user_id).await?))
}
