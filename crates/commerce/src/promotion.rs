//! Promo code validation and quoting.
//!
//! Evaluation is a pure function of the code's stored state, the order
//! subtotal, and the clock; it never mutates usage counters. Redemption is
//! the order store's job, inside the order-creation transaction, so the
//! eligibility check and the increment stay atomic under concurrency.

use chrono::{DateTime, Utc};
use cloudberry_core::{DiscountKind, Money};
use sqlx::PgPool;
use thiserror::Error;

use crate::db::PromoRepository;
use crate::error::CommerceError;
use crate::models::{AppliedPromo, PromoCode};

/// Typed, caller-facing promo rejections. None of these is retryable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PromoError {
    /// Unknown or inactive code.
    #[error("invalid promo code")]
    InvalidCode,

    /// Outside the code's validity window.
    #[error("promo code has expired")]
    Expired,

    /// The usage cap has been consumed.
    #[error("promo code usage limit reached")]
    UsageExhausted,

    /// The order subtotal is below the code's minimum.
    #[error("order subtotal is below the promo minimum of {minimum}")]
    BelowMinimum {
        /// The minimum subtotal the code requires, in minor units.
        minimum: Money,
    },
}

/// Evaluate a promo code against an order subtotal at a point in time.
///
/// Returns the discount in minor units. Percentage discounts round half-up;
/// fixed discounts are capped at the subtotal so the discount can never
/// exceed what it discounts.
///
/// # Errors
///
/// Returns the applicable [`PromoError`]; checks run in the order
/// inactive → window → usage → minimum, so the caller sees the most
/// fundamental failure first.
pub fn evaluate(
    promo: &PromoCode,
    subtotal: Money,
    now: DateTime<Utc>,
) -> Result<Money, PromoError> {
    if !promo.active {
        return Err(PromoError::InvalidCode);
    }

    // Window is inclusive on both ends.
    if now < promo.valid_from || now > promo.valid_until {
        return Err(PromoError::Expired);
    }

    if promo.used_count >= promo.max_uses {
        return Err(PromoError::UsageExhausted);
    }

    if subtotal < promo.min_order {
        return Err(PromoError::BelowMinimum {
            minimum: promo.min_order,
        });
    }

    let discount = match promo.kind {
        DiscountKind::Percentage => subtotal.percentage(promo.value.clamp(0, 100)),
        DiscountKind::Fixed => Money::from_minor(promo.value).unwrap_or(Money::ZERO),
    };

    Ok(discount.min(subtotal))
}

/// A promo code validated against a specific subtotal.
#[derive(Debug, Clone)]
pub struct PromoQuote {
    pub promo: PromoCode,
    pub discount: Money,
}

impl PromoQuote {
    /// The applied-promo handle that order creation consumes.
    #[must_use]
    pub fn applied(&self) -> AppliedPromo {
        AppliedPromo {
            id: self.promo.id,
            code: self.promo.code.clone(),
            discount: self.discount,
        }
    }
}

/// Stateless promo validator over the promo repository.
pub struct PromotionValidator<'a> {
    promos: PromoRepository<'a>,
}

impl<'a> PromotionValidator<'a> {
    /// Create a new validator.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            promos: PromoRepository::new(pool),
        }
    }

    /// Validate a user-entered code against an order subtotal.
    ///
    /// Never increments `used_count`; pass the resulting
    /// [`PromoQuote::applied`] handle into order creation to redeem.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Promo` with the typed rejection, or
    /// `CommerceError::Repository` if the lookup fails.
    pub async fn validate(
        &self,
        code: &str,
        subtotal: Money,
    ) -> Result<PromoQuote, CommerceError> {
        let promo = self
            .promos
            .get_by_code(code)
            .await?
            .ok_or(PromoError::InvalidCode)?;

        let discount = evaluate(&promo, subtotal, Utc::now())?;

        tracing::debug!(code = %promo.code, discount = %discount, "Promo code validated");

        Ok(PromoQuote { promo, discount })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use cloudberry_core::PromoCodeId;

    fn money(minor: i64) -> Money {
        Money::from_minor(minor).unwrap()
    }

    fn promo(kind: DiscountKind, value: i64) -> PromoCode {
        let now = Utc::now();
        PromoCode {
            id: PromoCodeId::new(1),
            code: "SAVE10".into(),
            kind,
            value,
            min_order: money(1000),
            max_uses: 100,
            used_count: 0,
            active: true,
            valid_from: now - TimeDelta::days(1),
            valid_until: now + TimeDelta::days(1),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_inactive_code_is_invalid() {
        let mut p = promo(DiscountKind::Percentage, 10);
        p.active = false;
        assert_eq!(
            evaluate(&p, money(5000), Utc::now()),
            Err(PromoError::InvalidCode)
        );
    }

    #[test]
    fn test_window_is_inclusive() {
        let p = promo(DiscountKind::Percentage, 10);
        assert!(evaluate(&p, money(5000), p.valid_from).is_ok());
        assert!(evaluate(&p, money(5000), p.valid_until).is_ok());
        assert_eq!(
            evaluate(&p, money(5000), p.valid_from - TimeDelta::seconds(1)),
            Err(PromoError::Expired)
        );
        assert_eq!(
            evaluate(&p, money(5000), p.valid_until + TimeDelta::seconds(1)),
            Err(PromoError::Expired)
        );
    }

    #[test]
    fn test_exhausted_usage() {
        let mut p = promo(DiscountKind::Percentage, 10);
        p.used_count = p.max_uses;
        assert_eq!(
            evaluate(&p, money(5000), Utc::now()),
            Err(PromoError::UsageExhausted)
        );
    }

    #[test]
    fn test_below_minimum_surfaces_the_minimum() {
        let p = promo(DiscountKind::Percentage, 10);
        let err = evaluate(&p, money(999), Utc::now()).unwrap_err();
        assert_eq!(
            err,
            PromoError::BelowMinimum {
                minimum: money(1000)
            }
        );
        assert!(err.to_string().contains("1000"));
    }

    #[test]
    fn test_percentage_discount() {
        let p = promo(DiscountKind::Percentage, 10);
        assert_eq!(evaluate(&p, money(5000), Utc::now()).unwrap(), money(500));
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        let p = promo(DiscountKind::Percentage, 15);
        // 15% of 1990 = 298.5 -> 299
        assert_eq!(evaluate(&p, money(1990), Utc::now()).unwrap(), money(299));
    }

    #[test]
    fn test_fixed_discount_capped_at_subtotal() {
        let mut p = promo(DiscountKind::Fixed, 2000);
        p.min_order = Money::ZERO;
        assert_eq!(evaluate(&p, money(5000), Utc::now()).unwrap(), money(2000));
        assert_eq!(evaluate(&p, money(1500), Utc::now()).unwrap(), money(1500));
    }

    #[test]
    fn test_check_order_inactive_beats_expired() {
        let mut p = promo(DiscountKind::Percentage, 10);
        p.active = false;
        p.valid_until = Utc::now() - TimeDelta::days(2);
        assert_eq!(
            evaluate(&p, money(5000), Utc::now()),
            Err(PromoError::InvalidCode)
        );
    }
}
