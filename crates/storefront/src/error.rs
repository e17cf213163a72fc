//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use cloudberry_commerce::CommerceError;
use cloudberry_commerce::db::RepositoryError;
use crate::services::CatalogError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Order lifecycle operation failed.
    #[error("Commerce error: {0}")]
    Commerce(#[from] CommerceError),

    /// Catalog service operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
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
            Self::Catalog(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the error is a server-side fault worth reporting.
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Internal(_)
                | Self::Catalog(_)
                | Self::Commerce(CommerceError::Repository(_))
        )
    }

    /// Client-facing message; internal details stay out of responses.
    fn public_message(&self) -> String {
        match self {
            Self::Commerce(CommerceError::Repository(RepositoryError::Unavailable(_))) => {
                "Service temporarily unavailable, please retry".to_string()
            }
            Self::Commerce(CommerceError::Repository(_)) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::Catalog(_) => "External service error".to_string(),
            Self::Commerce(err) => err.to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
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
    use cloudberry_commerce::promotion::PromoError;
    use cloudberry_core::OrderStatus;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Commerce(CommerceError::Validation("x".into())).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Commerce(CommerceError::Promo(PromoError::InvalidCode)).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Commerce(CommerceError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Commerce(CommerceError::IllegalTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::Processing,
            })
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Commerce(CommerceError::Repository(RepositoryError::Unavailable(
                sqlx::Error::PoolTimedOut
            )))
            .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::Unauthorized("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_internal_details_not_exposed() {
        let err = AppError::Commerce(CommerceError::Repository(RepositoryError::Database(
            sqlx::Error::WorkerCrashed,
        )));
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn test_promo_messages_are_exposed() {
        let err = AppError::Commerce(CommerceError::Promo(PromoError::InvalidCode));
        assert_eq!(err.public_message(), "invalid promo code");
    }
}
