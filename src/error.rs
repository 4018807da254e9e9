use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error type shared by every handler.
///
/// Form validation failures and unauthenticated mutations are not errors
/// here: the former re-render a form, the latter redirect.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("no {0} found")]
    EmptyListing(&'static str),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Error while hashing password: {0}")]
    PasswordHash(argon2::password_hash::Error),
}

impl From<argon2::password_hash::Error> for AppError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AppError::PasswordHash(err)
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            AppError::NotFound { .. } | AppError::EmptyListing(_) => {
                (StatusCode::NOT_FOUND, "fail")
            }
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "fail"),
            AppError::Database(sqlx::Error::RowNotFound) => (StatusCode::NOT_FOUND, "fail"),
            AppError::Database(_) | AppError::Token(_) | AppError::PasswordHash(_) => {
                tracing::error!(error = %self, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "error")
            }
        };

        let message = match status {
            StatusCode::INTERNAL_SERVER_ERROR => "An internal error occurred".to_string(),
            _ => self.to_string(),
        };

        let body = json!({
            "status": kind,
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}
