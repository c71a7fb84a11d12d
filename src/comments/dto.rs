use serde::Deserialize;

use crate::{error::AppResult, validation::Violations};

#[derive(Debug, Default, Deserialize)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub post_id: Option<i64>,
    #[serde(default)]
    pub description: String,
}

impl CreateCommentRequest {
    /// Returns the post id alongside the trimmed text.
    pub fn validate(self) -> AppResult<(i64, String)> {
        let mut v = Violations::new();
        v.check(self.post_id.is_some(), "post_id should not be empty")
            .not_empty("description", &self.description);
        v.finish()?;
        Ok((self.post_id.unwrap_or_default(), self.description.trim().to_string()))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCommentRequest {
    #[serde(default)]
    pub description: String,
}

impl UpdateCommentRequest {
    pub fn validate(self) -> AppResult<String> {
        Violations::new()
            .not_empty("description", &self.description)
            .finish()?;
        Ok(self.description.trim().to_string())
    }
}
