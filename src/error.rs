use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::policy::PostAction;

/// AppError
///
/// The single error type shared by the policy core, the repository and the handlers.
/// Every variant maps to exactly one HTTP status in the `IntoResponse` impl below.
#[derive(Debug, Error)]
pub enum AppError {
    /// A policy predicate failed. The reason is surfaced verbatim to the caller.
    #[error("access denied ({action}): {reason}")]
    AccessDenied { action: PostAction, reason: String },

    /// Moderation-level update outside {0, 1, 2}.
    #[error("invalid moderation level: {0}")]
    InvalidLevel(i64),

    #[error("{0} not found")]
    NotFound(String),

    /// No credentials, or credentials that could not be resolved to an actor.
    #[error("unauthorized")]
    Unauthorized,

    /// Authenticated, but lacking the administrator role.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored data the service cannot interpret, such as an out-of-range level.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::AccessDenied { .. } | AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InvalidLevel(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Storage failures are logged in full but never echoed to the client.
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("database error: {:?}", e);
                "internal server error".to_string()
            }
            AppError::Internal(detail) => {
                tracing::error!("internal error: {}", detail);
                "internal server error".to_string()
            }
            AppError::AccessDenied { reason, .. } => reason.clone(),
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
