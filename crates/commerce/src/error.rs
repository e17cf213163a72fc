//! The shared error taxonomy for the commerce crate.

use cloudberry_core::OrderStatus;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::promotion::PromoError;

/// Errors surfaced by the commerce services.
///
/// The taxonomy mirrors what callers need to do about each class:
/// `Validation` is caller-fixable and never retried, `NotFound` and
/// `Conflict`/`IllegalTransition` are terminal for the request, promo errors
/// carry their own typed reasons, and only
/// [`RepositoryError::Unavailable`] (via `Repository`) is safe to retry.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// Missing or malformed input; the caller can fix and resubmit.
    #[error("validation error: {0}")]
    Validation(String),

    /// The referenced order or promo code does not exist.
    #[error("not found")]
    NotFound,

    /// The request conflicts with current state (e.g. an explicit link
    /// attempt against an order owned by someone else).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A status transition not present in the workflow table.
    #[error("illegal status transition: {from} -> {to}")]
    IllegalTransition {
        /// Status the order is currently in.
        from: OrderStatus,
        /// Status the caller asked for.
        to: OrderStatus,
    },

    /// Promo code rejection with its typed reason.
    #[error(transparent)]
    Promo(#[from] PromoError),

    /// Failure in the persistence layer.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl CommerceError {
    /// Whether retrying the same request may succeed.
    ///
    /// Only transient store faults qualify; every other class is
    /// deterministic for the same input and state.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Repository(RepositoryError::Unavailable(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(!CommerceError::NotFound.is_retryable());
        assert!(!CommerceError::Validation("x".into()).is_retryable());
        assert!(!CommerceError::Promo(PromoError::InvalidCode).is_retryable());
        assert!(
            CommerceError::Repository(RepositoryError::Unavailable(sqlx::Error::PoolTimedOut))
                .is_retryable()
        );
        assert!(
            !CommerceError::Repository(RepositoryError::NotFound).is_retryable()
        );
    }

    #[test]
    fn test_illegal_transition_message_names_both_states() {
        let err = CommerceError::IllegalTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Processing,
        };
        assert_eq!(
            err.to_string(),
            "illegal status transition: delivered -> processing"
        );
    }
}
