//! Promotional discount codes.

use chrono::{DateTime, Utc};
use cloudberry_core::{DiscountKind, Money, PromoCodeId};
use serde::Serialize;

/// A promotional discount code.
///
/// Codes are stored and compared in upper-case form; lookups normalize the
/// caller's input first. `used_count <= max_uses` always holds: redemption
/// happens through one conditional update, never a read-then-write.
#[derive(Debug, Clone, Serialize)]
pub struct PromoCode {
    pub id: PromoCodeId,
    /// Upper-case code as entered at checkout.
    pub code: String,
    pub kind: DiscountKind,
    /// Percent (0-100) for [`DiscountKind::Percentage`], minor units for
    /// [`DiscountKind::Fixed`].
    pub value: i64,
    /// Minimum order subtotal the code applies to.
    pub min_order: Money,
    pub max_uses: i32,
    pub used_count: i32,
    pub active: bool,
    /// Validity window, inclusive on both ends.
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PromoCode {
    /// Normalize a user-entered code for lookup and storage.
    #[must_use]
    pub fn normalize(code: &str) -> String {
        code.trim().to_uppercase()
    }

    /// Uses left before the cap is reached.
    #[must_use]
    pub const fn remaining_uses(&self) -> i32 {
        self.max_uses.saturating_sub(self.used_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(PromoCode::normalize(" save10 "), "SAVE10");
        assert_eq!(PromoCode::normalize("SAVE10"), "SAVE10");
    }
}
