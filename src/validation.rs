use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Collects field-level messages and turns them into one `AppError::Validation`.
#[derive(Debug, Default)]
pub(crate) struct Violations(Vec<String>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, msg: impl Into<String>) -> &mut Self {
        if !ok {
            self.0.push(msg.into());
        }
        self
    }

    pub fn not_empty(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(!value.trim().is_empty(), format!("{field} should not be empty"))
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(is_valid_email(value), format!("{field} must be an email"))
    }

    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) -> &mut Self {
        let len = value.chars().count();
        self.check(
            (min..=max).contains(&len),
            format!("{field} must be longer than or equal to {min} and shorter than or equal to {max} characters"),
        )
    }

    pub fn finish(&mut self) -> Result<(), AppError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(std::mem::take(&mut self.0)))
        }
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
