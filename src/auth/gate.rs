//! Request gate: decides per route whether a bearer token is required and
//! which secret it must verify against, then stores the decoded identity in
//! the request extensions for the extractors in `auth::extractors`.

use axum::{
    extract::{MatchedPath, Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use super::claims::RefreshClaims;
use super::extractors::CurrentUser;
use crate::{error::AppError, state::AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRequirement {
    /// No token needed.
    Public,
    /// Bearer access token.
    Access,
    /// Bearer refresh token; the raw token is kept for hash verification.
    Refresh,
}

pub struct RouteAuth {
    pub method: &'static str,
    pub path: &'static str,
    pub auth: AuthRequirement,
}

/// Routes that are not access-protected. Anything absent here requires an
/// access token.
pub static ROUTE_AUTH: &[RouteAuth] = &[
    RouteAuth { method: "GET", path: "/health", auth: AuthRequirement::Public },
    RouteAuth { method: "POST", path: "/auth/signup", auth: AuthRequirement::Public },
    RouteAuth { method: "POST", path: "/auth/signin", auth: AuthRequirement::Public },
    RouteAuth { method: "POST", path: "/auth/refresh", auth: AuthRequirement::Refresh },
    RouteAuth { method: "GET", path: "/report", auth: AuthRequirement::Public },
];

pub fn requirement_for(method: &str, path: &str) -> AuthRequirement {
    ROUTE_AUTH
        .iter()
        .find(|r| r.method.eq_ignore_ascii_case(method) && r.path == path)
        .map(|r| r.auth)
        .unwrap_or(AuthRequirement::Access)
}

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let value = header?.trim();
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}

pub async fn request_gate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let requirement = requirement_for(req.method().as_str(), &path);
    if requirement == AuthRequirement::Public {
        return Ok(next.run(req).await);
    }

    let token = bearer_token(
        req.headers()
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok()),
    )
    .map(str::to_string)
    .ok_or_else(|| {
        warn!(%path, "missing or malformed bearer token");
        AppError::Unauthorized
    })?;

    match requirement {
        AuthRequirement::Access => {
            let claims = state.keys.verify_access(&token).map_err(|e| {
                debug!(error = %e, "access token rejected");
                warn!(%path, "invalid access token");
                AppError::Unauthorized
            })?;
            req.extensions_mut().insert(CurrentUser(claims));
        }
        AuthRequirement::Refresh => {
            let claims = state.keys.verify_refresh(&token).map_err(|e| {
                debug!(error = %e, "refresh token rejected");
                warn!(%path, "invalid refresh token");
                AppError::Unauthorized
            })?;
            req.extensions_mut().insert(RefreshClaims {
                claims,
                refresh_token: token,
            });
        }
        AuthRequirement::Public => {}
    }

    Ok(next.run(req).await)
}
