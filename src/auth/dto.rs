use serde::Deserialize;

use crate::{
    error::AppResult,
    validation::{normalize_email, Violations},
};

/// Request body for signup.
#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl SignUpRequest {
    pub fn validate(mut self) -> AppResult<Self> {
        self.email = normalize_email(&self.email);
        self.name = self.name.trim().to_string();
        Violations::new()
            .not_empty("name", &self.name)
            .not_empty("password", &self.password)
            .email("email", &self.email)
            .finish()?;
        Ok(self)
    }
}

/// Request body for signin.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl SignInRequest {
    pub fn validate(mut self) -> AppResult<Self> {
        self.email = normalize_email(&self.email);
        Violations::new()
            .not_empty("password", &self.password)
            .email("email", &self.email)
            .finish()?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn signup_normalizes_and_accepts() {
        let req: SignUpRequest =
            serde_json::from_str(r#"{"name":" John ","email":" John@Doe.com","password":"x"}"#).unwrap();
        let req = req.validate().unwrap();
        assert_eq!(req.email, "john@doe.com");
        assert_eq!(req.name, "John");
    }

    #[test]
    fn signup_missing_fields_are_reported() {
        let req: SignUpRequest = serde_json::from_str("{}").unwrap();
        match req.validate().unwrap_err() {
            AppError::Validation(msgs) => assert_eq!(msgs.len(), 3),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn signin_rejects_bad_email() {
        let req: SignInRequest =
            serde_json::from_str(r#"{"email":"nope","password":"x"}"#).unwrap();
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }
}
