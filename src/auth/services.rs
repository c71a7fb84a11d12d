//! Signup, signin, logout and refresh-token rotation.
//!
//! A user's session lives entirely in the `refresh_hash` column: `None` means
//! logged out, `Some(h)` means logged in with the refresh token hashing to `h`.
//! There is one slot per user, so a new signin invalidates the refresh token
//! handed out by the previous one.

use std::sync::Arc;

use tracing::{info, warn};

use super::{
    claims::TokenPair,
    jwt::JwtKeys,
    password::SecretHasher,
    repo::CredentialStore,
    repo_types::{NewUser, User},
};
use crate::error::{AppError, AppResult};

pub struct SessionService {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<dyn SecretHasher>,
    keys: Arc<JwtKeys>,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn SecretHasher>,
        keys: Arc<JwtKeys>,
    ) -> Self {
        Self {
            store,
            hasher,
            keys,
        }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn hasher(&self) -> &Arc<dyn SecretHasher> {
        &self.hasher
    }

    pub async fn signup(&self, email: &str, password: &str, name: &str) -> AppResult<TokenPair> {
        let password_hash = self.hasher.hash(password)?;
        let user = self
            .store
            .create(NewUser {
                email: email.to_string(),
                name: name.to_string(),
                password_hash,
            })
            .await?;

        let tokens = self.issue_and_store(&user).await?;
        info!(user_id = user.id, "user signed up");
        Ok(tokens)
    }

    pub async fn signin(&self, email: &str, password: &str) -> AppResult<TokenPair> {
        let Some(user) = self.store.find_by_email(email).await? else {
            warn!("signin for unknown email");
            return Err(AppError::AccessDenied);
        };

        if !self.hasher.verify(password, &user.password_hash)? {
            warn!(user_id = user.id, "signin with wrong password");
            return Err(AppError::AccessDenied);
        }

        let tokens = self.issue_and_store(&user).await?;
        info!(user_id = user.id, "user signed in");
        Ok(tokens)
    }

    /// Clears the refresh slot. Calling it on an already logged-out user is a no-op.
    pub async fn logout(&self, user_id: i64) -> AppResult<bool> {
        if !self.store.set_refresh_hash(user_id, None).await? {
            return Err(AppError::not_found("user"));
        }
        info!(user_id, "user logged out");
        Ok(true)
    }

    /// Exchanges the live refresh token for a new pair and rotates the slot.
    ///
    /// The slot is rewritten with a compare-and-swap on the hash the presented
    /// token was verified against, so two concurrent refreshes with the same
    /// token cannot both succeed.
    pub async fn refresh(&self, user_id: i64, presented: &str) -> AppResult<TokenPair> {
        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;
        let Some(stored) = user.refresh_hash.as_deref() else {
            warn!(user_id, "refresh while logged out");
            return Err(AppError::Unauthorized);
        };

        match self.hasher.verify(presented, stored) {
            Ok(true) => {}
            Ok(false) => {
                warn!(user_id, "stale refresh token presented");
                return Err(AppError::Unauthorized);
            }
            Err(e) => {
                warn!(user_id, error = %e, "stored refresh hash unreadable");
                return Err(AppError::Unauthorized);
            }
        }

        let tokens = self.keys.issue_pair(user.id, &user.email)?;
        let new_hash = self.hasher.hash(&tokens.refresh_token)?;
        if !self.store.swap_refresh_hash(user.id, stored, &new_hash).await? {
            warn!(user_id, "refresh lost a concurrent rotation");
            return Err(AppError::Unauthorized);
        }

        info!(user_id, "tokens refreshed");
        Ok(tokens)
    }

    async fn issue_and_store(&self, user: &User) -> AppResult<TokenPair> {
        let tokens = self.keys.issue_pair(user.id, &user.email)?;
        let hash = self.hasher.hash(&tokens.refresh_token)?;
        if !self.store.set_refresh_hash(user.id, Some(&hash)).await? {
            warn!(user_id = user.id, "user vanished before the session was stored");
            return Err(AppError::AccessDenied);
        }
        Ok(tokens)
    }
}
