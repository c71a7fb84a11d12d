use std::{fmt, str::FromStr};

use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    #[serde(skip_serializing)]
    pub image_key: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A post together with its rating tallies.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RatedPost {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub post: Post,
    pub likes: i64,
    pub dislikes: i64,
}

impl From<Post> for RatedPost {
    fn from(post: Post) -> Self {
        Self {
            post,
            likes: 0,
            dislikes: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    Like,
    Dislike,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Like => "like",
            Rating::Dislike => "dislike",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rating {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "like" => Ok(Rating::Like),
            "dislike" => Ok(Rating::Dislike),
            _ => Err(AppError::validation(
                "rate must be one of the following values: like, dislike",
            )),
        }
    }
}

/// Per-post totals for the public report.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PostActivity {
    pub title: String,
    pub number_of_comments: i64,
    pub views: i64,
    pub likes: i64,
    pub dislikes: i64,
}

/// Fields a post update may change; `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub image_key: Option<String>,
}
