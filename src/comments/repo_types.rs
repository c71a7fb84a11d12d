use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// A visible comment; soft-deleted rows are never loaded into this type.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Who may remove a comment: its author or the author of the post under it.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct CommentOwnership {
    pub comment_author: i64,
    pub post_author: i64,
}

impl CommentOwnership {
    pub fn may_delete(&self, user_id: i64) -> bool {
        self.comment_author == user_id || self.post_author == user_id
    }
}
