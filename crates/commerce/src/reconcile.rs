//! Guest-order identity reconciliation.
//!
//! When a previously anonymous purchaser authenticates, their guest orders
//! are linked to the new identity by up to three match strategies, applied
//! in order and strictly additive. Every ownership write goes through the
//! order store's compare-and-set, so a given order is linked at most once
//! overall no matter how many strategies match it or how many reconciliation
//! calls race each other.

use cloudberry_core::{Email, OrderId, UserId};
use serde::Serialize;
use sqlx::PgPool;

use crate::address_synth::{AddressSynthesizer, Synthesis};
use crate::db::{OrderRepository, ReassignOutcome};

/// The match strategies, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// A single order referenced explicitly by the caller.
    ExplicitOrder,
    /// Ownerless orders whose guest phone matches exactly.
    Phone,
    /// Ownerless orders whose guest email matches the identity's registered
    /// address.
    Email,
}

impl std::fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExplicitOrder => write!(f, "explicit_order"),
            Self::Phone => write!(f, "phone"),
            Self::Email => write!(f, "email"),
        }
    }
}

/// What a single strategy did.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyOutcome {
    pub strategy: MatchStrategy,
    /// Orders this strategy linked.
    pub linked: u64,
    /// Error message if the strategy failed; earlier strategies' links are
    /// already committed and stay committed.
    pub error: Option<String>,
}

/// Structured result of a reconciliation run.
///
/// Partial success is deliberate: the caller can report "N orders linked"
/// even when one strategy errored, and rerunning is always safe.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ReconcileSummary {
    /// Total orders linked across all strategies in this run.
    pub linked_count: u64,
    /// Per-strategy outcomes, in application order (only strategies that
    /// had input to work with appear).
    pub strategies: Vec<StrategyOutcome>,
    /// Whether a standing address was created as a side effect.
    pub address_synthesized: bool,
}

/// Merges anonymous orders into an authenticated identity.
pub struct IdentityReconciler<'a> {
    pool: &'a PgPool,
}

impl<'a> IdentityReconciler<'a> {
    /// Create a new reconciler.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Link guest orders to `owner`, then synthesize a standing address.
    ///
    /// Strategy failures are captured in the summary rather than propagated:
    /// a failure in a later strategy never aborts or rolls back an earlier
    /// strategy's committed reassignments. Rerunning with identical
    /// arguments finds nothing left to link and reports `linked_count == 0`.
    pub async fn reconcile(
        &self,
        owner: UserId,
        registered_email: Option<&Email>,
        phone: Option<&str>,
        explicit_order: Option<OrderId>,
    ) -> ReconcileSummary {
        let orders = OrderRepository::new(self.pool);
        let mut summary = ReconcileSummary::default();

        if let Some(order_id) = explicit_order {
            let outcome = match orders.reassign_owner(order_id, owner).await {
                Ok(ReassignOutcome::Linked) => StrategyOutcome {
                    strategy: MatchStrategy::ExplicitOrder,
                    linked: 1,
                    error: None,
                },
                // Linking an order we already own is a safe no-op.
                Ok(ReassignOutcome::AlreadyOwned(existing)) if existing == owner => {
                    StrategyOutcome {
                        strategy: MatchStrategy::ExplicitOrder,
                        linked: 0,
                        error: None,
                    }
                }
                Ok(ReassignOutcome::AlreadyOwned(_)) => StrategyOutcome {
                    strategy: MatchStrategy::ExplicitOrder,
                    linked: 0,
                    error: Some(format!(
                        "order {order_id} is already linked to another account"
                    )),
                },
                Err(e) => StrategyOutcome {
                    strategy: MatchStrategy::ExplicitOrder,
                    linked: 0,
                    error: Some(e.to_string()),
                },
            };
            record(&mut summary, outcome, owner);
        }

        if let Some(phone) = phone.map(str::trim).filter(|p| !p.is_empty()) {
            let outcome = match orders.claim_guest_orders_by_phone(phone, owner).await {
                Ok(linked) => StrategyOutcome {
                    strategy: MatchStrategy::Phone,
                    linked,
                    error: None,
                },
                Err(e) => StrategyOutcome {
                    strategy: MatchStrategy::Phone,
                    linked: 0,
                    error: Some(e.to_string()),
                },
            };
            record(&mut summary, outcome, owner);
        }

        if let Some(email) = registered_email {
            let outcome = match orders.claim_guest_orders_by_email(email, owner).await {
                Ok(linked) => StrategyOutcome {
                    strategy: MatchStrategy::Email,
                    linked,
                    error: None,
                },
                Err(e) => StrategyOutcome {
                    strategy: MatchStrategy::Email,
                    linked: 0,
                    error: Some(e.to_string()),
                },
            };
            record(&mut summary, outcome, owner);
        }

        // Unconditional by contract; its own guard keeps it idempotent.
        match AddressSynthesizer::new(self.pool)
            .synthesize_from_earliest_order(owner)
            .await
        {
            Ok(Synthesis::Created(_)) => summary.address_synthesized = true,
            Ok(Synthesis::Skipped(reason)) => {
                tracing::debug!(owner_id = %owner, ?reason, "Address synthesis skipped");
            }
            Err(e) => {
                tracing::warn!(owner_id = %owner, error = %e, "Address synthesis failed");
            }
        }

        tracing::info!(
            owner_id = %owner,
            linked_count = summary.linked_count,
            "Reconciliation finished"
        );

        summary
    }
}

fn record(summary: &mut ReconcileSummary, outcome: StrategyOutcome, owner: UserId) {
    if let Some(error) = &outcome.error {
        tracing::warn!(
            owner_id = %owner,
            strategy = %outcome.strategy,
            error = %error,
            "Reconciliation strategy failed"
        );
    }
    summary.linked_count += outcome.linked;
    summary.strategies.push(outcome);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_serializes_per_strategy() {
        let summary = ReconcileSummary {
            linked_count: 2,
            strategies: vec![
                StrategyOutcome {
                    strategy: MatchStrategy::Phone,
                    linked: 2,
                    error: None,
                },
                StrategyOutcome {
                    strategy: MatchStrategy::Email,
                    linked: 0,
                    error: Some("store unavailable".into()),
                },
            ],
            address_synthesized: true,
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["linked_count"], 2);
        assert_eq!(json["strategies"][0]["strategy"], "phone");
        assert_eq!(json["strategies"][1]["error"], "store unavailable");
        assert_eq!(json["address_synthesized"], true);
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(MatchStrategy::ExplicitOrder.to_string(), "explicit_order");
        assert_eq!(MatchStrategy::Phone.to_string(), "phone");
        assert_eq!(MatchStrategy::Email.to_string(), "email");
    }
}
