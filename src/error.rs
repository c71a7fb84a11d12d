use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sqlx::postgres::PgDatabaseError;
use tracing::error;

/// Error surfaced by services and handlers.
///
/// Storage faults are translated once, in `From<sqlx::Error>`, so handlers
/// never see Postgres error codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),
    #[error("{0} must be unique.")]
    Conflict(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("access denied")]
    AccessDenied,
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(vec![msg.into()])
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::AccessDenied => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn messages(&self) -> Vec<String> {
        match self {
            AppError::Validation(msgs) => msgs.clone(),
            AppError::Conflict(field) => vec![format!("{field} must be unique.")],
            AppError::Unauthorized => vec!["Unauthorized".into()],
            AppError::AccessDenied => vec!["Access denied.".into()],
            AppError::NotFound(what) => vec![format!("{what} not found.")],
            AppError::Internal(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    status_code: u16,
    error: &'static str,
    message: Vec<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let AppError::Internal(e) = &self {
            error!(error = ?e, "internal error");
        }
        let body = ErrorBody {
            status_code: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error"),
            message: self.messages(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => return AppError::not_found("record"),
            sqlx::Error::Database(db) => {
                let table = db
                    .try_downcast_ref::<PgDatabaseError>()
                    .and_then(|pg| pg.table());
                let field = field_from_constraint(db.constraint().unwrap_or_default(), table);
                if db.is_unique_violation() {
                    return AppError::Conflict(field);
                }
                if db.is_foreign_key_violation() {
                    return AppError::validation(format!("{field} not found."));
                }
            }
            _ => {}
        }
        AppError::Internal(anyhow::Error::new(err).context("database error"))
    }
}

/// Malformed, mistyped or wrongly labelled JSON bodies are client errors.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::validation(rejection.body_text())
    }
}

/// Recovers the column name from a Postgres constraint name such as
/// `users_email_key` or `comments_post_id_fkey`.
pub(crate) fn field_from_constraint(constraint: &str, table: Option<&str>) -> String {
    let trimmed = ["_fkey", "_pkey", "_key"]
        .iter()
        .find_map(|suffix| constraint.strip_suffix(suffix))
        .unwrap_or(constraint);

    let field = match table.and_then(|t| trimmed.strip_prefix(t)) {
        Some(rest) => rest.trim_start_matches('_'),
        None => trimmed.split_once('_').map(|(_, rest)| rest).unwrap_or(trimmed),
    };

    if field.is_empty() {
        "unknown".to_string()
    } else {
        field.to_string()
    }
}
