//! Promo code management commands.

use chrono::{DateTime, TimeDelta, Utc};
use cloudberry_commerce::db::{NewPromoCode, PromoRepository};
use cloudberry_core::{DiscountKind, Money};

/// Create a promo code.
///
/// # Errors
///
/// Returns an error for invalid arguments, a duplicate code, or a database
/// failure.
pub async fn create(
    code: &str,
    kind: &str,
    value: i64,
    min_order: i64,
    max_uses: i32,
    valid_from: Option<&str>,
    valid_until: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let kind: DiscountKind = kind.parse()?;

    if matches!(kind, DiscountKind::Percentage) && !(0..=100).contains(&value) {
        return Err("percentage value must be between 0 and 100".into());
    }
    if value < 0 {
        return Err("discount value cannot be negative".into());
    }
    if max_uses < 0 {
        return Err("max uses cannot be negative".into());
    }

    let min_order = Money::from_minor(min_order)?;

    let valid_from = parse_or(valid_from, Utc::now())?;
    let valid_until = parse_or(valid_until, Utc::now() + TimeDelta::days(365))?;
    if valid_from > valid_until {
        return Err("valid-from must not be after valid-until".into());
    }

    let pool = super::connect().await?;
    let created = PromoRepository::new(&pool)
        .create(&NewPromoCode {
            code: code.to_owned(),
            kind,
            value,
            min_order,
            max_uses,
            valid_from,
            valid_until,
        })
        .await?;

    tracing::info!(
        code = %created.code,
        kind = %created.kind,
        value = created.value,
        max_uses = created.max_uses,
        "Promo code created"
    );

    Ok(())
}

/// Deactivate a promo code.
///
/// # Errors
///
/// Returns an error if the code doesn't exist or the database fails.
pub async fn deactivate(code: &str) -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;
    PromoRepository::new(&pool).deactivate(code).await?;

    tracing::info!(code = %code, "Promo code deactivated");
    Ok(())
}

/// List all promo codes.
///
/// # Errors
///
/// Returns an error if the database fails.
pub async fn list() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;
    let promos = PromoRepository::new(&pool).list().await?;

    for promo in &promos {
        tracing::info!(
            code = %promo.code,
            kind = %promo.kind,
            value = promo.value,
            used = promo.used_count,
            max_uses = promo.max_uses,
            active = promo.active,
            "promo"
        );
    }
    tracing::info!("{} promo code(s)", promos.len());

    Ok(())
}

/// Parse an RFC 3339 timestamp, or fall back to the default.
fn parse_or(
    raw: Option<&str>,
    default: DateTime<Utc>,
) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    match raw {
        Some(s) => Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc)),
        None => Ok(default),
    }
}
