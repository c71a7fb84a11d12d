use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::{Comment, CommentOwnership};
use crate::error::AppResult;

#[async_trait]
pub trait CommentStore: Send + Sync {
    /// A missing post fails with the `"post_id not found."` validation error.
    async fn insert(&self, post_id: i64, user_id: i64, description: &str) -> AppResult<Comment>;
    /// Only the author may edit, and only while the comment is visible.
    async fn update_own(&self, id: i64, user_id: i64, description: &str)
        -> AppResult<Option<Comment>>;
    async fn ownership(&self, id: i64) -> AppResult<Option<CommentOwnership>>;
    async fn soft_delete(&self, id: i64, deleted_by: i64) -> AppResult<()>;
    async fn list_visible(&self, post_id: i64) -> AppResult<Vec<Comment>>;
}

const COMMENT_COLUMNS: &str = "id, post_id, user_id, description, created_at, updated_at";

#[derive(Clone)]
pub struct PgCommentStore {
    db: PgPool,
}

impl PgCommentStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CommentStore for PgCommentStore {
    async fn insert(&self, post_id: i64, user_id: i64, description: &str) -> AppResult<Comment> {
        // `comments_post_id_fkey` turns into the validation error.
        let row = sqlx::query_as::<_, Comment>(&format!(
            r#"
            INSERT INTO comments (post_id, user_id, description)
            VALUES ($1, $2, $3)
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(post_id)
        .bind(user_id)
        .bind(description)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update_own(
        &self,
        id: i64,
        user_id: i64,
        description: &str,
    ) -> AppResult<Option<Comment>> {
        let row = sqlx::query_as::<_, Comment>(&format!(
            r#"
            UPDATE comments
            SET description = $3, updated_at = now()
            WHERE id = $1 AND user_id = $2 AND deleted_by IS NULL
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(description)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn ownership(&self, id: i64) -> AppResult<Option<CommentOwnership>> {
        let row = sqlx::query_as::<_, CommentOwnership>(
            r#"
            SELECT c.user_id AS comment_author, p.user_id AS post_author
            FROM comments c
            JOIN posts p ON p.id = c.post_id
            WHERE c.id = $1 AND c.deleted_by IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn soft_delete(&self, id: i64, deleted_by: i64) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE comments
            SET deleted_by = $2, updated_at = now()
            WHERE id = $1 AND deleted_by IS NULL
            "#,
        )
        .bind(id)
        .bind(deleted_by)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn list_visible(&self, post_id: i64) -> AppResult<Vec<Comment>> {
        let rows = sqlx::query_as::<_, Comment>(&format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comments
            WHERE post_id = $1 AND deleted_by IS NULL
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(post_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}
