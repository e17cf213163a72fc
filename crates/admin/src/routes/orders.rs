//! Order console handlers: listing, detail, and the status workflow.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use cloudberry_commerce::db::{OrderRepository, StatusPatch};
use cloudberry_commerce::models::Order;
use cloudberry_commerce::workflow::OrderWorkflow;
use cloudberry_core::{OrderId, OrderStatus};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::auth::RequireAdminAuth;
use crate::state::AppState;

/// Query params for the order list.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Filter by status (e.g. `pending`).
    pub status: Option<OrderStatus>,
}

/// List orders, newest first, optionally filtered by status.
///
/// GET /orders?status=pending
///
/// # Errors
///
/// Returns 500 on repository failure.
#[instrument(skip(_admin, state))]
pub async fn list(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool()).list(params.status).await?;
    Ok(Json(orders))
}

/// Fetch a single order with its lines.
///
/// GET /orders/{id}
///
/// # Errors
///
/// Returns 404 if the order doesn't exist.
#[instrument(skip(_admin, state))]
pub async fn detail(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = OrderRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;
    Ok(Json(order))
}

/// Input for the order update endpoint.
#[derive(Debug, Deserialize)]
pub struct UpdateOrderInput {
    /// New status; must be a legal transition from the current status.
    pub status: Option<OrderStatus>,
    /// Carrier tracking number.
    pub tracking_number: Option<String>,
    /// Operator notes.
    pub notes: Option<String>,
}

/// Update an order's status, tracking number, and/or notes.
///
/// POST /orders/{id}
///
/// Tracking and notes may be set without a status change. Status changes go
/// through the workflow state machine and are rejected with 409 when the
/// transition is not in the table.
///
/// # Errors
///
/// Returns 404 for a missing order, 409 for an illegal transition, 422 for
/// an empty update.
#[instrument(skip(_admin, state, input), fields(order_id = %id))]
pub async fn update(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(input): Json<UpdateOrderInput>,
) -> Result<Json<Order>> {
    let patch = StatusPatch {
        status: input.status,
        tracking_number: input.tracking_number,
        notes: input.notes,
    };

    let order = OrderWorkflow::new(state.pool()).apply(id, patch).await?;

    Ok(Json(order))
}
