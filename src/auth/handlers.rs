use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        claims::TokenPair,
        dto::{SignInRequest, SignUpRequest},
        extractors::{AuthUser, RefreshUser},
    },
    error::AppResult,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/signin", post(signin))
        .route("/auth/logout", post(logout))
        .route("/auth/refresh", post(refresh))
}

#[instrument(skip(state, body))]
pub async fn signup(
    State(state): State<AppState>,
    body: Result<Json<SignUpRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<TokenPair>)> {
    let Json(payload) = body?;
    let payload = payload.validate()?;
    let tokens = state
        .sessions
        .signup(&payload.email, &payload.password, &payload.name)
        .await?;
    Ok((StatusCode::CREATED, Json(tokens)))
}

#[instrument(skip(state, body))]
pub async fn signin(
    State(state): State<AppState>,
    body: Result<Json<SignInRequest>, JsonRejection>,
) -> AppResult<Json<TokenPair>> {
    let Json(payload) = body?;
    let payload = payload.validate()?;
    let tokens = state.sessions.signin(&payload.email, &payload.password).await?;
    Ok(Json(tokens))
}

#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<bool>> {
    Ok(Json(state.sessions.logout(user_id).await?))
}

#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    RefreshUser(presented): RefreshUser,
) -> AppResult<Json<TokenPair>> {
    let tokens = state
        .sessions
        .refresh(presented.claims.sub, &presented.refresh_token)
        .await?;
    Ok(Json(tokens))
}
