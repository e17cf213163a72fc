//! Order tracking endpoint.

use axum::{
    Json,
    extract::{Path, State},
};
use cloudberry_commerce::db::OrderRepository;
use cloudberry_commerce::models::Order;
use cloudberry_core::OrderId;
use serde::Serialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::state::AppState;

/// Tracking response body.
///
/// `requires_auth` is true unless the caller is authenticated and either
/// owns the order or the order is still ownerless (guest-trackable). Order
/// details are only included when access is granted.
#[derive(Debug, Serialize)]
pub struct TrackOrderResponse {
    pub requires_auth: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
}

/// Track an order's status.
///
/// GET /api/orders/{id}/track
///
/// # Errors
///
/// Returns 404 if the order doesn't exist.
#[instrument(skip(state, user))]
pub async fn track_order(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<TrackOrderResponse>> {
    let order = OrderRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;

    let authorized = user
        .as_ref()
        .is_some_and(|u| order.owner_id.is_none() || order.owner_id == Some(u.id));

    if authorized {
        Ok(Json(TrackOrderResponse {
            requires_auth: false,
            order: Some(order),
        }))
    } else {
        Ok(Json(TrackOrderResponse {
            requires_auth: true,
            order: None,
        }))
    }
}
