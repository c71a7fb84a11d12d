use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::repo_types::{NewUser, User, UserChanges};
use crate::error::AppResult;

/// Persistence seam for user credentials and the single refresh-token slot.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>>;
    /// Fails with `AppError::Conflict("email")` when the email is taken.
    async fn create(&self, user: NewUser) -> AppResult<User>;
    async fn update_profile(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>>;
    /// Unconditionally overwrites the slot. Returns `false` if the user is gone.
    async fn set_refresh_hash(&self, id: i64, hash: Option<&str>) -> AppResult<bool>;
    /// Writes `new` only if the slot still holds `expected`.
    async fn swap_refresh_hash(&self, id: i64, expected: &str, new: &str) -> AppResult<bool>;
}

const USER_COLUMNS: &str = "id, email, name, password_hash, refresh_hash, created_at";

#[derive(Clone)]
pub struct PgCredentialStore {
    db: PgPool,
}

impl PgCredentialStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn update_profile(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET email = COALESCE($2, email),
                   name = COALESCE($3, name),
                   password_hash = COALESCE($4, password_hash),
                   updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.email)
        .bind(changes.name)
        .bind(changes.password_hash)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn set_refresh_hash(&self, id: i64, hash: Option<&str>) -> AppResult<bool> {
        let res = sqlx::query("UPDATE users SET refresh_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(hash)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn swap_refresh_hash(&self, id: i64, expected: &str, new: &str) -> AppResult<bool> {
        let res = sqlx::query(
            "UPDATE users SET refresh_hash = $3 WHERE id = $1 AND refresh_hash = $2",
        )
        .bind(id)
        .bind(expected)
        .bind(new)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() == 1)
    }
}
