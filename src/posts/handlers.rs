use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection,
        DefaultBodyLimit, Multipart, Path, State,
    },
    http::StatusCode,
    routing::{patch, post},
    Json, Router,
};
use tracing::{instrument, warn};

use super::{
    dto::{ImageUpload, PostDetails, PostForm, RateRequest},
    repo_types::RatedPost,
    services,
};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
};

/// Hard cap on the whole multipart body; the per-image limit is checked separately.
const BODY_LIMIT: usize = 10 * 1024 * 1024;

pub fn post_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", post(create_post))
        .route(
            "/posts/:id",
            patch(update_post).get(get_post).delete(delete_post),
        )
        .route("/posts/:id/rate", patch(rate_post))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
}

/// Reads `title`, `description` and an optional `image` file; unknown fields are skipped.
async fn read_post_form(mut mp: Multipart) -> AppResult<PostForm> {
    let mut form = PostForm::default();
    while let Some(field) = mp.next_field().await.map_err(bad_multipart)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("title") => form.title = Some(field.text().await.map_err(bad_multipart)?),
            Some("description") => {
                form.description = Some(field.text().await.map_err(bad_multipart)?)
            }
            Some("image") => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let body = field.bytes().await.map_err(bad_multipart)?;
                form.image = Some(ImageUpload { body, content_type });
            }
            _ => {}
        }
    }
    Ok(form)
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> AppError {
    warn!(error = %e, "malformed multipart body");
    AppError::validation(format!("invalid multipart body: {}", e.body_text()))
}

#[instrument(skip(state, mp))]
pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mp: Result<Multipart, MultipartRejection>,
) -> AppResult<(StatusCode, Json<RatedPost>)> {
    let new = read_post_form(mp?)
        .await?
        .validate_new(state.config.s3.max_image_bytes)?;
    let post = services::create_post(&state, user_id, new).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

#[instrument(skip(state, mp))]
pub async fn update_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
    mp: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<RatedPost>> {
    let (changes, image) = read_post_form(mp?)
        .await?
        .validate_changes(state.config.s3.max_image_bytes)?;
    let post = services::update_post(&state, id, user_id, changes, image).await?;
    Ok(Json(post))
}

#[instrument(skip(state))]
pub async fn get_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<PostDetails>> {
    Ok(Json(services::get_post(&state, id, user_id).await?))
}

#[instrument(skip(state, body))]
pub async fn rate_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
    body: Result<Json<RateRequest>, JsonRejection>,
) -> AppResult<Json<bool>> {
    let Json(payload) = body?;
    let rating = payload.validate()?;
    Ok(Json(services::rate_post(&state, id, user_id, rating).await?))
}

#[instrument(skip(state))]
pub async fn delete_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    Ok(Json(services::delete_post(&state, id, user_id).await?))
}
