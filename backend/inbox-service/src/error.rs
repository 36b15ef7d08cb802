use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("not found")]
    NotFound,

    #[error("not authorized")]
    NotAuthorized,

    #[error("not a participant of this conversation")]
    NotParticipant,

    #[error("sender and recipient are the same user")]
    SelfReference,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("story is expired or no longer active")]
    Expired,

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    /// Returns whether this error is retryable (e.g., pool timeout, broken
    /// connection). Retrying is always safe for the read/view/reset
    /// transitions; callers of `send`/`create` decide for themselves.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Database(e) => {
                matches!(
                    e,
                    sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
                )
            }
            AppError::Transient(_) => true,
            _ => false,
        }
    }

    /// Returns HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::NotAuthorized | AppError::NotParticipant => StatusCode::FORBIDDEN,
            AppError::SelfReference | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Expired => StatusCode::GONE,
            AppError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_) | AppError::StartServer(_) | AppError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Store/bootstrap failure details stay in the logs, not the body.
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                "internal server error".to_string()
            }
            AppError::Config(_) | AppError::StartServer(_) => "internal server error".to_string(),
            other => other.to_string(),
        };

        (
            status,
            Json(serde_json::json!({
                "error": message,
                "status": status.as_u16(),
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_domain_errors_to_statuses() {
        assert_eq!(AppError::NotFound.status_code().as_u16(), 404);
        assert_eq!(AppError::NotAuthorized.status_code().as_u16(), 403);
        assert_eq!(AppError::NotParticipant.status_code().as_u16(), 403);
        assert_eq!(AppError::SelfReference.status_code().as_u16(), 400);
        assert_eq!(
            AppError::Validation("missing content".into())
                .status_code()
                .as_u16(),
            400
        );
        assert_eq!(AppError::Expired.status_code().as_u16(), 410);
        assert_eq!(
            AppError::Transient("pool exhausted".into())
                .status_code()
                .as_u16(),
            503
        );
    }

    #[test]
    fn transient_errors_are_retryable() {
        assert!(AppError::Transient("timeout".into()).is_retryable());
        assert!(!AppError::NotFound.is_retryable());
        assert!(!AppError::Validation("bad".into()).is_retryable());
    }
}
