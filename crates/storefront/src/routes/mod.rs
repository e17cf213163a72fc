//! Storefront route handlers.

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

pub mod account;
pub mod checkout;
pub mod promo;
pub mod track;

/// Build the storefront router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/checkout", post(checkout::create_order))
        .route("/api/promo/validate", post(promo::validate))
        .route("/api/orders/{id}/track", get(track::track_order))
        .route("/api/account/link-orders", post(account::link_orders))
        .route("/api/account/orders", get(account::list_orders))
}
