use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::claims::{Claims, RefreshClaims};
use crate::error::AppError;

/// Access-token identity placed in the request extensions by the gate.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Claims);

impl CurrentUser {
    pub fn id(&self) -> i64 {
        self.0.sub
    }
}

/// Reads the authenticated user id for access-protected handlers.
pub struct AuthUser(pub i64);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .map(|u| AuthUser(u.id()))
            .ok_or(AppError::Unauthorized)
    }
}

/// Decoded refresh claims plus the raw token, for the refresh handler.
pub struct RefreshUser(pub RefreshClaims);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RefreshUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RefreshClaims>()
            .cloned()
            .map(RefreshUser)
            .ok_or(AppError::Unauthorized)
    }
}
