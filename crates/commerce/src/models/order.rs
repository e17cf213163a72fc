//! Order aggregate domain types.

use chrono::{DateTime, Utc};
use cloudberry_core::{Email, Money, OrderId, OrderLineId, OrderStatus, ProductId, PromoCodeId, UserId};
use serde::{Deserialize, Serialize};

/// The denormalized shipping address embedded in every order.
///
/// This is a point-in-time copy, not a reference: the order must stay
/// historically accurate even if the purchaser's standing address changes
/// later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSnapshot {
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<Email>,
    pub street: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
}

impl AddressSnapshot {
    /// Names of required fields that are missing or blank, in field order.
    ///
    /// An empty result means the snapshot is complete enough to ship to.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        for (name, value) in [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("street", &self.street),
            ("city", &self.city),
            ("region", &self.region),
            ("postal_code", &self.postal_code),
        ] {
            if value.trim().is_empty() {
                missing.push(name);
            }
        }
        missing
    }
}

/// A single purchased product within an order.
///
/// The name and unit price are frozen copies taken from the catalog at
/// purchase time and are never recomputed from the live catalog.
#[derive(Debug, Clone, Serialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    /// Unit price at purchase time, in minor units.
    pub unit_price: Money,
    pub quantity: u32,
}

impl OrderLine {
    /// `unit_price * quantity`, or `None` on overflow.
    #[must_use]
    pub const fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_mul(self.quantity)
    }
}

/// The aggregate root of a single purchase.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    /// Human-facing unique reference (e.g. `CB-9X2K4M7Q`).
    pub order_number: String,
    /// Owning identity. One-way: once set, never reset to null.
    pub owner_id: Option<UserId>,
    /// Guest contact captured at creation; retained for audit after linking.
    pub guest_email: Option<Email>,
    pub guest_phone: Option<String>,
    pub subtotal: Money,
    pub shipping: Money,
    pub discount: Money,
    /// Always `subtotal + shipping - discount`.
    pub total: Money,
    pub status: OrderStatus,
    pub shipping_address: AddressSnapshot,
    /// Opaque label; not a processed payment instrument.
    pub payment_method: String,
    /// Promo code applied at checkout, if any (upper-case form).
    pub promo_code: Option<String>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Whether the money fields satisfy `total == subtotal + shipping - discount`.
    ///
    /// Violations are programming-contract errors, not user errors; the
    /// repository surfaces them as data corruption instead of correcting
    /// them silently.
    #[must_use]
    pub fn money_consistent(&self) -> bool {
        self.subtotal
            .checked_add(self.shipping)
            .and_then(|gross| gross.checked_sub(self.discount))
            .is_some_and(|expected| expected == self.total)
    }
}

/// A line item being purchased, with its catalog snapshot already resolved.
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

/// A promo code that has been validated against the order subtotal.
///
/// Produced by [`crate::promotion::PromotionValidator::validate`]; the
/// discount here is the only discount the store will accept.
#[derive(Debug, Clone)]
pub struct AppliedPromo {
    pub id: PromoCodeId,
    /// Normalized (upper-case) code, recorded on the order snapshot.
    pub code: String,
    pub discount: Money,
}

/// Input to order creation.
///
/// Money fields submitted by clients are advisory display values and do not
/// appear here: the subtotal is recomputed from the lines, the shipping
/// charge is priced by the caller's own policy, and the discount comes from
/// promo validation.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub owner_id: Option<UserId>,
    pub guest_email: Option<Email>,
    pub guest_phone: Option<String>,
    pub lines: Vec<NewOrderLine>,
    pub shipping_address: AddressSnapshot,
    pub payment_method: String,
    pub shipping: Money,
    pub promo: Option<AppliedPromo>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn snapshot() -> AddressSnapshot {
        AddressSnapshot {
            first_name: "Maja".into(),
            last_name: "Lindqvist".into(),
            phone: Some("+46701234567".into()),
            email: Some(Email::parse("maja@example.com").unwrap()),
            street: "Storgatan 1".into(),
            city: "Umeå".into(),
            region: "Västerbotten".into(),
            postal_code: "90326".into(),
        }
    }

    fn order_with_money(subtotal: i64, shipping: i64, discount: i64, total: i64) -> Order {
        Order {
            id: OrderId::new(1),
            order_number: "CB-TEST0001".into(),
            owner_id: None,
            guest_email: None,
            guest_phone: Some("+46701234567".into()),
            subtotal: Money::from_minor(subtotal).unwrap(),
            shipping: Money::from_minor(shipping).unwrap(),
            discount: Money::from_minor(discount).unwrap(),
            total: Money::from_minor(total).unwrap(),
            status: OrderStatus::Pending,
            shipping_address: snapshot(),
            payment_method: "invoice".into(),
            promo_code: None,
            tracking_number: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            lines: Vec::new(),
        }
    }

    #[test]
    fn test_money_consistency() {
        assert!(order_with_money(5000, 495, 500, 4995).money_consistent());
        assert!(!order_with_money(5000, 495, 500, 5000).money_consistent());
        // discount larger than subtotal + shipping can never balance
        assert!(!order_with_money(100, 0, 500, 0).money_consistent());
    }

    #[test]
    fn test_missing_fields_reports_blanks() {
        let mut addr = snapshot();
        assert!(addr.missing_fields().is_empty());

        addr.street = "  ".into();
        addr.postal_code = String::new();
        assert_eq!(addr.missing_fields(), vec!["street", "postal_code"]);
    }

    #[test]
    fn test_line_total_overflow_is_none() {
        let line = OrderLine {
            id: OrderLineId::new(1),
            order_id: OrderId::new(1),
            product_id: ProductId::new(1),
            product_name: "Cloudberry jam".into(),
            unit_price: Money::from_minor(i64::MAX).unwrap(),
            quantity: 2,
        };
        assert!(line.line_total().is_none());
    }
}
