use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::repo_types::{PostChanges, RatedPost, Rating};
use crate::{
    comments::repo_types::Comment,
    error::{AppError, AppResult},
    storage::ext_from_mime,
    validation::Violations,
};

const TITLE_MAX: usize = 100;

pub struct ImageUpload {
    pub body: Bytes,
    pub content_type: String,
}

impl ImageUpload {
    pub fn check(&self, max_bytes: usize) -> AppResult<()> {
        let mut v = Violations::new();
        v.check(
            ext_from_mime(&self.content_type).is_some(),
            "image must be a jpeg, png or gif file",
        )
        .check(!self.body.is_empty(), "image should not be empty")
        .check(
            self.body.len() <= max_bytes,
            format!("image must be smaller than or equal to {max_bytes} bytes"),
        );
        v.finish()
    }
}

/// Fields collected from a `multipart/form-data` post body.
#[derive(Default)]
pub struct PostForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<ImageUpload>,
}

impl PostForm {
    /// Creation needs both text fields.
    pub fn validate_new(self, max_image_bytes: usize) -> AppResult<NewPost> {
        let title = self.title.unwrap_or_default().trim().to_string();
        let description = self.description.unwrap_or_default().trim().to_string();
        let mut v = Violations::new();
        v.length("title", &title, 1, TITLE_MAX)
            .not_empty("description", &description);
        v.finish()?;
        if let Some(img) = &self.image {
            img.check(max_image_bytes)?;
        }
        Ok(NewPost {
            title,
            description,
            image: self.image,
        })
    }

    /// Every field is optional on update, but the ones present must be valid.
    pub fn validate_changes(self, max_image_bytes: usize) -> AppResult<(PostChanges, Option<ImageUpload>)> {
        let title = self.title.map(|t| t.trim().to_string());
        let description = self.description.map(|d| d.trim().to_string());
        let mut v = Violations::new();
        if let Some(t) = &title {
            v.length("title", t, 1, TITLE_MAX);
        }
        if let Some(d) = &description {
            v.not_empty("description", d);
        }
        v.finish()?;
        if let Some(img) = &self.image {
            img.check(max_image_bytes)?;
        }
        let changes = PostChanges {
            title,
            description,
            ..Default::default()
        };
        Ok((changes, self.image))
    }
}

pub struct NewPost {
    pub title: String,
    pub description: String,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    #[serde(default)]
    pub rate: String,
}

impl RateRequest {
    pub fn validate(&self) -> AppResult<Rating> {
        if self.rate.trim().is_empty() {
            return Err(AppError::validation("rate should not be empty"));
        }
        self.rate.parse()
    }
}

#[derive(Debug, Serialize)]
pub struct PostDetails {
    #[serde(flatten)]
    pub post: RatedPost,
    pub comments: Vec<Comment>,
    pub views: i64,
}
