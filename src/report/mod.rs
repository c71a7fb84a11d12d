//! Public activity report over the oldest posts.

use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use crate::{error::AppResult, posts::repo_types::PostActivity, state::AppState};

pub const REPORT_LIMIT: i64 = 100;

pub fn router() -> Router<AppState> {
    Router::new().route("/report", get(report))
}

#[instrument(skip(state))]
pub async fn report(State(state): State<AppState>) -> AppResult<Json<Vec<PostActivity>>> {
    Ok(Json(state.posts.activity(REPORT_LIMIT).await?))
}
