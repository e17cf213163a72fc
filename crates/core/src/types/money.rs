//! Monetary amounts in the smallest currency unit.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when constructing a [`Money`] from a negative amount.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("money amount cannot be negative: {0}")]
pub struct NegativeAmount(pub i64);

/// A non-negative monetary amount in the smallest currency unit (e.g. cents).
///
/// All order money fields (subtotal, shipping, discount, total) are integer
/// minor units. Arithmetic is checked: operations that would overflow or go
/// negative return `None` instead of wrapping, so a money invariant violation
/// can never be produced silently.
///
/// ```
/// use cloudberry_core::Money;
///
/// let subtotal = Money::from_minor(5000).unwrap();
/// assert_eq!(subtotal.percentage(10), Money::from_minor(500).unwrap());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(try_from = "i64", into = "i64")]
pub struct Money(i64);

impl Money {
    /// Zero amount.
    pub const ZERO: Self = Self(0);

    /// Create a `Money` from minor units.
    ///
    /// # Errors
    ///
    /// Returns [`NegativeAmount`] if `minor` is negative.
    pub const fn from_minor(minor: i64) -> Result<Self, NegativeAmount> {
        if minor < 0 {
            Err(NegativeAmount(minor))
        } else {
            Ok(Self(minor))
        }
    }

    /// The amount in minor units.
    #[must_use]
    pub const fn as_minor(self) -> i64 {
        self.0
    }

    /// Checked addition.
    #[must_use]
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Checked subtraction; `None` if the result would be negative.
    #[must_use]
    pub const fn checked_sub(self, rhs: Self) -> Option<Self> {
        if rhs.0 > self.0 {
            None
        } else {
            Some(Self(self.0 - rhs.0))
        }
    }

    /// Checked multiplication by a unit count (e.g. line quantity).
    #[must_use]
    pub const fn checked_mul(self, qty: u32) -> Option<Self> {
        match self.0.checked_mul(qty as i64) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// A percentage of this amount, rounded half-up to the nearest minor unit.
    ///
    /// Saturates at `i64::MAX` on overflow; percentage discounts are bounded
    /// by validation long before that point.
    #[must_use]
    pub const fn percentage(self, percent: i64) -> Self {
        let product = self.0.saturating_mul(percent);
        Self(product.saturating_add(50) / 100)
    }

    /// The smaller of two amounts.
    #[must_use]
    pub const fn min(self, other: Self) -> Self {
        if self.0 <= other.0 { self } else { other }
    }

    /// Whether this amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<i64> for Money {
    type Error = NegativeAmount;

    fn try_from(minor: i64) -> Result<Self, Self::Error> {
        Self::from_minor(minor)
    }
}

impl From<Money> for i64 {
    fn from(m: Money) -> Self {
        m.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// SQLx support (with postgres feature): stored as BIGINT minor units.
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i64 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let minor = <i64 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::from_minor(minor)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i64 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_minor_rejects_negative() {
        assert!(Money::from_minor(-1).is_err());
        assert!(Money::from_minor(0).is_ok());
        assert!(Money::from_minor(1).is_ok());
    }

    #[test]
    fn test_checked_add() {
        let a = Money::from_minor(100).unwrap();
        let b = Money::from_minor(250).unwrap();
        assert_eq!(a.checked_add(b), Some(Money::from_minor(350).unwrap()));
        assert!(
            Money::from_minor(i64::MAX)
                .unwrap()
                .checked_add(b)
                .is_none()
        );
    }

    #[test]
    fn test_checked_sub_never_negative() {
        let a = Money::from_minor(100).unwrap();
        let b = Money::from_minor(250).unwrap();
        assert_eq!(b.checked_sub(a), Some(Money::from_minor(150).unwrap()));
        assert!(a.checked_sub(b).is_none());
    }

    #[test]
    fn test_checked_mul() {
        let unit = Money::from_minor(1999).unwrap();
        assert_eq!(
            unit.checked_mul(3),
            Some(Money::from_minor(5997).unwrap())
        );
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        let m = Money::from_minor(5000).unwrap();
        assert_eq!(m.percentage(10).as_minor(), 500);

        // 125 * 10% = 12.5 -> rounds up to 13
        let m = Money::from_minor(125).unwrap();
        assert_eq!(m.percentage(10).as_minor(), 13);

        // 124 * 10% = 12.4 -> rounds down to 12
        let m = Money::from_minor(124).unwrap();
        assert_eq!(m.percentage(10).as_minor(), 12);
    }

    #[test]
    fn test_min_caps_discount() {
        let subtotal = Money::from_minor(300).unwrap();
        let fixed = Money::from_minor(1000).unwrap();
        assert_eq!(fixed.min(subtotal), subtotal);
    }

    #[test]
    fn test_serde_rejects_negative() {
        assert!(serde_json::from_str::<Money>("-5").is_err());
        let m: Money = serde_json::from_str("1250").unwrap();
        assert_eq!(m.as_minor(), 1250);
        assert_eq!(serde_json::to_string(&m).unwrap(), "1250");
    }
}
