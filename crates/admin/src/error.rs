//! Unified error handling with Sentry integration.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use cloudberry_commerce::CommerceError;
use cloudberry_commerce::db::RepositoryError;

/// Application-level error type for the admin panel.
#[derive(Debug, Error)]
pub enum AppError {
    /// Order lifecycle operation failed.
    #[error("Commerce error: {0}")]
    Commerce(#[from] CommerceError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not an authenticated admin.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body returned to clients.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Commerce(err) => match err {
                CommerceError::Validation(_) | CommerceError::Promo(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                CommerceError::NotFound => StatusCode::NOT_FOUND,
                CommerceError::Conflict(_) | CommerceError::IllegalTransition { .. } => {
                    StatusCode::CONFLICT
                }
                CommerceError::Repository(repo) => match repo {
                    RepositoryError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                    RepositoryError::NotFound => StatusCode::NOT_FOUND,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                },
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message; internal details stay out of responses.
    fn public_message(&self) -> String {
        match self {
            Self::Commerce(CommerceError::Repository(_)) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::Commerce(err) => err.to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Internal(_) | Self::Commerce(CommerceError::Repository(_))
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = ErrorBody {
            error: self.public_message(),
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        Self::Commerce(CommerceError::Repository(e))
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use cloudberry_core::OrderStatus;

    #[test]
    fn test_illegal_transition_is_conflict() {
        let err = AppError::Commerce(CommerceError::IllegalTransition {
            from: OrderStatus::Cancelled,
            to: OrderStatus::Processing,
        });
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert!(err.public_message().contains("cancelled -> processing"));
    }

    #[test]
    fn test_repository_errors_are_hidden() {
        let err = AppError::from(RepositoryError::DataCorruption("bad row".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal server error");
    }
}
