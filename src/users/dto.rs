use serde::{Deserialize, Serialize};

use crate::{
    auth::repo_types::User,
    error::AppResult,
    validation::{normalize_email, Violations},
};

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub email: String,
    pub name: String,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl UpdateUserRequest {
    pub fn validate(mut self) -> AppResult<Self> {
        self.email = self.email.as_deref().map(normalize_email);
        let mut v = Violations::new();
        if let Some(name) = &self.name {
            v.not_empty("name", name);
        }
        if let Some(email) = &self.email {
            v.email("email", email);
        }
        if let Some(password) = &self.password {
            v.not_empty("password", password);
        }
        v.finish()?;
        Ok(self)
    }
}
