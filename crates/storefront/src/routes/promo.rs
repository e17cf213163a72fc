//! Promo code validation endpoint.

use axum::{Json, extract::State};
use cloudberry_commerce::promotion::PromotionValidator;
use cloudberry_core::Money;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::Result;
use crate::state::AppState;

/// Promo validation request body.
#[derive(Debug, Deserialize)]
pub struct ValidatePromoRequest {
    pub code: String,
    /// Order subtotal in minor units.
    pub subtotal: Money,
}

/// Promo validation response body.
#[derive(Debug, Serialize)]
pub struct ValidatePromoResponse {
    /// Discount in minor units the code would apply to this subtotal.
    pub discount: Money,
}

/// Validate a promo code against an order subtotal.
///
/// POST /api/promo/validate
///
/// Validation never consumes a use; redemption happens at checkout.
///
/// # Errors
///
/// Returns 422 with the typed reason (invalid, expired, exhausted, or below
/// minimum).
#[instrument(skip(state, request), fields(code = %request.code))]
pub async fn validate(
    State(state): State<AppState>,
    Json(request): Json<ValidatePromoRequest>,
) -> Result<Json<ValidatePromoResponse>> {
    let quote = PromotionValidator::new(state.pool())
        .validate(&request.code, request.subtotal)
        .await?;

    Ok(Json(ValidatePromoResponse {
        discount: quote.discount,
    }))
}
