//! Database operations for the commerce `PostgreSQL` store.
//!
//! # Tables
//!
//! - `orders` - Order aggregate roots with embedded shipping snapshots
//! - `order_lines` - Line items, created atomically with their order
//! - `promo_codes` - Discount codes with atomic usage counting
//! - `standing_addresses` - Reusable per-account addresses
//!
//! # Migrations
//!
//! Migrations live in `crates/commerce/migrations/` and run via:
//! ```bash
//! cargo run -p cloudberry-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub mod addresses;
pub mod orders;
pub mod promos;

pub use addresses::AddressRepository;
pub use orders::{OrderRepository, ReassignOutcome, StatusPatch};
pub use promos::{NewPromoCode, PromoRepository};

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// The store is unreachable or out of capacity; safe to retry with
    /// backoff, unlike every other variant.
    #[error("store unavailable: {0}")]
    Unavailable(sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g. duplicate order number).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Unavailable(e)
            }
            other => Self::Database(other),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// The embedded schema migrations for the commerce store.
#[must_use]
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}
