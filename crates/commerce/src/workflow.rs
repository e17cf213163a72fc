//! Admin-facing order status workflow.
//!
//! The workflow is the only writer of order status, tracking numbers, and
//! operator notes. It enforces the transition table on
//! [`OrderStatus::can_transition_to`] before persisting; the store itself
//! only persists.

use cloudberry_core::{OrderId, OrderStatus};
use sqlx::PgPool;

use crate::db::{OrderRepository, StatusPatch};
use crate::error::CommerceError;
use crate::models::Order;

/// Drives orders through the bounded status state machine.
pub struct OrderWorkflow<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderWorkflow<'a> {
    /// Create a new workflow.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Apply a status change and/or tracking/notes update to an order.
    ///
    /// Tracking and notes may be set with or without a status change. A
    /// requested status must be a legal transition from the order's current
    /// status; the persistence layer then re-checks the current status in
    /// the same write, so two concurrent updates cannot both transition the
    /// order.
    ///
    /// # Errors
    ///
    /// - `CommerceError::Validation` if the patch is empty.
    /// - `CommerceError::NotFound` if the order doesn't exist.
    /// - `CommerceError::IllegalTransition` for a move outside the table.
    /// - `CommerceError::Conflict` if the order changed under the update.
    pub async fn apply(&self, id: OrderId, patch: StatusPatch) -> Result<Order, CommerceError> {
        if patch.is_empty() {
            return Err(CommerceError::Validation(
                "nothing to update: provide a status, tracking number, or notes".to_owned(),
            ));
        }

        let orders = OrderRepository::new(self.pool);

        let current = orders.get(id).await?.ok_or(CommerceError::NotFound)?;

        let expected = match patch.status {
            Some(next) => {
                if !current.status.can_transition_to(next) {
                    return Err(CommerceError::IllegalTransition {
                        from: current.status,
                        to: next,
                    });
                }
                // Guard the write on the status the legality check saw.
                Some(current.status)
            }
            None => None,
        };

        let updated = orders.update_status(id, expected, patch.clone()).await?;

        tracing::info!(
            order_id = %id,
            status = %updated.status,
            tracking = patch.tracking_number.is_some(),
            notes = patch.notes.is_some(),
            "Order updated"
        );

        Ok(updated)
    }
}
