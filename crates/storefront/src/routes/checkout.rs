//! Checkout: order creation.

use axum::{Json, extract::State};
use cloudberry_commerce::db::OrderRepository;
use cloudberry_commerce::error::CommerceError;
use cloudberry_commerce::models::{AddressSnapshot, NewOrder, NewOrderLine};
use cloudberry_commerce::promotion::PromotionValidator;
use cloudberry_core::{Email, Money, OrderId, ProductId};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::state::AppState;

/// A line in the checkout request: product reference and quantity only.
/// Names and prices come from the catalog, not the client.
#[derive(Debug, Deserialize)]
pub struct CheckoutLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Shipping address fields as submitted at checkout.
#[derive(Debug, Deserialize)]
pub struct CheckoutAddress {
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub street: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
}

/// Checkout request body.
///
/// `display_total` is what the client showed the customer; it is compared
/// against the server-computed total for drift monitoring and is never
/// trusted as an input.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    /// Guest contact email (ignored for authenticated checkouts).
    pub email: Option<String>,
    /// Guest contact phone (ignored for authenticated checkouts).
    pub phone: Option<String>,
    pub lines: Vec<CheckoutLine>,
    pub address: CheckoutAddress,
    pub payment_method: String,
    pub promo_code: Option<String>,
    pub display_total: Option<i64>,
}

/// Checkout response body.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: OrderId,
    pub order_number: String,
    /// Server-computed total in minor units.
    pub total: Money,
}

/// Create an order from a guest or authenticated checkout.
///
/// POST /api/checkout
///
/// The subtotal is recomputed from catalog unit prices, shipping is priced
/// by server policy, and the discount comes from promo validation. The
/// order, its lines, and the promo redemption commit as one transaction.
///
/// # Errors
///
/// Returns 422 for missing lines/address fields or a rejected promo code,
/// 502 if the catalog is unreachable.
#[instrument(skip(state, user, request))]
pub async fn create_order(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    let product_ids: Vec<ProductId> = request.lines.iter().map(|l| l.product_id).collect();
    if product_ids.is_empty() {
        return Err(CommerceError::Validation(
            "order must contain at least one line".to_owned(),
        )
        .into());
    }

    // Resolve authoritative name/price snapshots from the catalog.
    let snapshots = state.catalog().snapshots(&product_ids).await?;

    let mut lines = Vec::with_capacity(request.lines.len());
    for line in &request.lines {
        let Some(snapshot) = snapshots.get(&line.product_id) else {
            return Err(AppError::Internal(format!(
                "catalog omitted product {}",
                line.product_id
            )));
        };
        lines.push(NewOrderLine {
            product_id: line.product_id,
            product_name: snapshot.name.clone(),
            unit_price: snapshot.unit_price,
            quantity: line.quantity,
        });
    }

    let subtotal = lines
        .iter()
        .try_fold(Money::ZERO, |acc, line| {
            line.unit_price
                .checked_mul(line.quantity)
                .and_then(|t| acc.checked_add(t))
        })
        .ok_or_else(|| CommerceError::Validation("order subtotal overflows".to_owned()))?;

    let promo = match request.promo_code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => {
            let quote = PromotionValidator::new(state.pool())
                .validate(code, subtotal)
                .await?;
            Some(quote.applied())
        }
        _ => None,
    };

    let shipping = state.config().shipping.price(subtotal);

    let shipping_address = parse_address(request.address)?;

    // Authenticated checkouts are owned from the start; guests supply
    // contact info instead.
    let (owner_id, guest_email, guest_phone) = match &user {
        Some(u) => (Some(u.id), None, None),
        None => (
            None,
            parse_optional_email(request.email.as_deref())?,
            request
                .phone
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(ToOwned::to_owned),
        ),
    };

    let new_order = NewOrder {
        owner_id,
        guest_email,
        guest_phone,
        lines,
        shipping_address,
        payment_method: request.payment_method,
        shipping,
        promo,
    };

    let order = OrderRepository::new(state.pool()).create(new_order).await?;

    if let Some(display_total) = request.display_total
        && display_total != order.total.as_minor()
    {
        tracing::warn!(
            order_id = %order.id,
            display_total,
            computed_total = %order.total,
            "Client-displayed total drifted from computed total"
        );
    }

    state.notifier().order_confirmed(&order);

    Ok(Json(CheckoutResponse {
        order_id: order.id,
        order_number: order.order_number,
        total: order.total,
    }))
}

/// Parse and validate the submitted address into a snapshot.
fn parse_address(address: CheckoutAddress) -> Result<AddressSnapshot> {
    let email = parse_optional_email(address.email.as_deref())?;
    Ok(AddressSnapshot {
        first_name: address.first_name,
        last_name: address.last_name,
        phone: address
            .phone
            .map(|p| p.trim().to_owned())
            .filter(|p| !p.is_empty()),
        email,
        street: address.street,
        city: address.city,
        region: address.region,
        postal_code: address.postal_code,
    })
}

fn parse_optional_email(raw: Option<&str>) -> Result<Option<Email>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Email::parse(s)
            .map(Some)
            .map_err(|e| CommerceError::Validation(format!("invalid email: {e}")).into()),
        None => Ok(None),
    }
}
