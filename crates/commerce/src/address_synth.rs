//! Standing-address synthesis from order history.

use cloudberry_core::UserId;
use sqlx::PgPool;

use crate::db::{AddressRepository, OrderRepository, RepositoryError};
use crate::models::StandingAddress;

/// Outcome of a synthesis attempt.
#[derive(Debug)]
pub enum Synthesis {
    /// A standing address was materialized from the earliest usable order.
    Created(StandingAddress),
    /// Nothing was created; the reason says why.
    Skipped(SkipReason),
}

/// Why synthesis produced nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The owner already has a standing address. Synthesis runs after every
    /// reconciliation, so this guard is what makes repeated runs produce
    /// exactly one address.
    AlreadyHasAddress,
    /// None of the owner's orders carries a usable shipping snapshot.
    NoUsableOrder,
}

/// Derives a reusable standing address from an order's shipping snapshot.
pub struct AddressSynthesizer<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressSynthesizer<'a> {
    /// Create a new synthesizer.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Materialize a default standing address from the owner's earliest
    /// order with a non-empty shipping snapshot.
    ///
    /// Idempotent: if the owner already has any standing address the call
    /// skips instead of creating a duplicate.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a query fails.
    pub async fn synthesize_from_earliest_order(
        &self,
        owner: UserId,
    ) -> Result<Synthesis, RepositoryError> {
        let addresses = AddressRepository::new(self.pool);

        if addresses.any_for_owner(owner).await? {
            return Ok(Synthesis::Skipped(SkipReason::AlreadyHasAddress));
        }

        let orders = OrderRepository::new(self.pool);
        let mut owned = orders.list_by_owner(owner).await?;
        // list_by_owner returns newest first; synthesis wants the earliest.
        owned.sort_by_key(|o| o.created_at);

        let Some(source) = owned
            .into_iter()
            .find(|o| o.shipping_address.missing_fields().is_empty())
        else {
            return Ok(Synthesis::Skipped(SkipReason::NoUsableOrder));
        };

        let created = addresses
            .create_from_snapshot(owner, &source.shipping_address, true)
            .await?;

        tracing::info!(
            owner_id = %owner,
            order_id = %source.id,
            address_id = %created.id,
            "Standing address synthesized from order history"
        );

        Ok(Synthesis::Created(created))
    }
}
