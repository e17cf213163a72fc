//! Standing address repository.

use chrono::{DateTime, Utc};
use cloudberry_core::{AddressId, Email, UserId};
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::{AddressSnapshot, StandingAddress};

const ADDRESS_COLUMNS: &str = "id, owner_id, first_name, last_name, phone, email, \
     street, city, region, postal_code, is_default, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: AddressId,
    owner_id: UserId,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    email: Option<Email>,
    street: String,
    city: String,
    region: String,
    postal_code: String,
    is_default: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AddressRow> for StandingAddress {
    fn from(row: AddressRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            email: row.email,
            street: row.street,
            city: row.city,
            region: row.region,
            postal_code: row.postal_code,
            is_default: row.is_default,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for standing address database operations.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Whether the owner has at least one standing address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn any_for_owner(&self, owner: UserId) -> Result<bool, RepositoryError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM standing_addresses WHERE owner_id = $1)",
        )
        .bind(owner)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// List the owner's standing addresses, default first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_owner(
        &self,
        owner: UserId,
    ) -> Result<Vec<StandingAddress>, RepositoryError> {
        let sql = format!(
            "SELECT {ADDRESS_COLUMNS} FROM standing_addresses \
             WHERE owner_id = $1 \
             ORDER BY is_default DESC, created_at ASC"
        );
        let rows: Vec<AddressRow> = sqlx::query_as(&sql).bind(owner).fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Insert a standing address materialized from an order snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_from_snapshot(
        &self,
        owner: UserId,
        snapshot: &AddressSnapshot,
        is_default: bool,
    ) -> Result<StandingAddress, RepositoryError> {
        let sql = format!(
            "INSERT INTO standing_addresses \
                 (owner_id, first_name, last_name, phone, email, \
                  street, city, region, postal_code, is_default) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {ADDRESS_COLUMNS}"
        );
        let row: AddressRow = sqlx::query_as(&sql)
            .bind(owner)
            .bind(&snapshot.first_name)
            .bind(&snapshot.last_name)
            .bind(&snapshot.phone)
            .bind(&snapshot.email)
            .bind(&snapshot.street)
            .bind(&snapshot.city)
            .bind(&snapshot.region)
            .bind(&snapshot.postal_code)
            .bind(is_default)
            .fetch_one(self.pool)
            .await?;
        Ok(row.into())
    }
}
