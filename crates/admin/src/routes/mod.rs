//! Admin route handlers.

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

pub mod orders;

/// Build the admin router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(orders::list))
        .route("/orders/{id}", get(orders::detail))
        .route("/orders/{id}", post(orders::update))
}
