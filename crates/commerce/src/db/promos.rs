//! Promo code repository.
//!
//! Lookup and management only: redemption (the usage-count increment) lives
//! inside the order-creation transaction in
//! [`super::OrderRepository::create`], where it must be atomic with the
//! eligibility check.

use chrono::{DateTime, Utc};
use cloudberry_core::{DiscountKind, Money, PromoCodeId};
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::PromoCode;

const PROMO_COLUMNS: &str = "id, code, kind, value, min_order, max_uses, used_count, active, \
     valid_from, valid_until, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct PromoRow {
    id: PromoCodeId,
    code: String,
    kind: DiscountKind,
    value: i64,
    min_order: Money,
    max_uses: i32,
    used_count: i32,
    active: bool,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PromoRow> for PromoCode {
    fn from(row: PromoRow) -> Self {
        Self {
            id: row.id,
            code: row.code,
            kind: row.kind,
            value: row.value,
            min_order: row.min_order,
            max_uses: row.max_uses,
            used_count: row.used_count,
            active: row.active,
            valid_from: row.valid_from,
            valid_until: row.valid_until,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Fields for creating a promo code (CLI management surface).
#[derive(Debug, Clone)]
pub struct NewPromoCode {
    pub code: String,
    pub kind: DiscountKind,
    pub value: i64,
    pub min_order: Money,
    pub max_uses: i32,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

/// Repository for promo code database operations.
pub struct PromoRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PromoRepository<'a> {
    /// Create a new promo repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look up a promo code by its user-entered form.
    ///
    /// The input is normalized to upper-case before the exact-match lookup.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_code(&self, code: &str) -> Result<Option<PromoCode>, RepositoryError> {
        let normalized = PromoCode::normalize(code);
        let sql = format!("SELECT {PROMO_COLUMNS} FROM promo_codes WHERE code = $1");
        let row: Option<PromoRow> = sqlx::query_as(&sql)
            .bind(&normalized)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Create a new promo code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, promo: &NewPromoCode) -> Result<PromoCode, RepositoryError> {
        let sql = format!(
            "INSERT INTO promo_codes (code, kind, value, min_order, max_uses, valid_from, valid_until) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {PROMO_COLUMNS}"
        );
        let row: PromoRow = sqlx::query_as(&sql)
            .bind(PromoCode::normalize(&promo.code))
            .bind(promo.kind)
            .bind(promo.value)
            .bind(promo.min_order)
            .bind(promo.max_uses)
            .bind(promo.valid_from)
            .bind(promo.valid_until)
            .fetch_one(self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return RepositoryError::Conflict("promo code already exists".to_owned());
                }
                RepositoryError::from(e)
            })?;
        Ok(row.into())
    }

    /// Deactivate a promo code by its user-entered form.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the code doesn't exist.
    pub async fn deactivate(&self, code: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE promo_codes SET active = FALSE, updated_at = now() WHERE code = $1",
        )
        .bind(PromoCode::normalize(code))
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// List all promo codes, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<PromoCode>, RepositoryError> {
        let sql = format!("SELECT {PROMO_COLUMNS} FROM promo_codes ORDER BY created_at DESC");
        let rows: Vec<PromoRow> = sqlx::query_as(&sql).fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
