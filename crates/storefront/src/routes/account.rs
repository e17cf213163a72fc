//! Account endpoints: guest-order linking and order history.

use axum::{Json, extract::State};
use cloudberry_commerce::db::OrderRepository;
use cloudberry_commerce::models::Order;
use cloudberry_commerce::reconcile::{IdentityReconciler, ReconcileSummary};
use cloudberry_core::OrderId;
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Link-orders request body.
#[derive(Debug, Deserialize)]
pub struct LinkOrdersRequest {
    /// Phone number used on past guest orders.
    pub phone: Option<String>,
    /// A specific order to claim.
    pub order_id: Option<OrderId>,
}

/// Link the caller's past guest orders to their account.
///
/// POST /api/account/link-orders
///
/// Matches by explicit order reference, then phone, then the account's
/// registered email. Safe to call repeatedly: each order links at most once
/// and a rerun reports zero newly linked orders.
#[instrument(skip(state, user, request), fields(user_id = %user.id))]
pub async fn link_orders(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(request): Json<LinkOrdersRequest>,
) -> Json<ReconcileSummary> {
    let summary = IdentityReconciler::new(state.pool())
        .reconcile(
            user.id,
            Some(&user.email),
            request.phone.as_deref(),
            request.order_id,
        )
        .await;

    Json(summary)
}

/// List the caller's orders, newest first.
///
/// GET /api/account/orders
///
/// # Errors
///
/// Returns 500 on repository failure.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_orders(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool())
        .list_by_owner(user.id)
        .await?;

    Ok(Json(orders))
}
