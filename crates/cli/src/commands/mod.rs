//! CLI command implementations.

use secrecy::SecretString;
use sqlx::PgPool;

pub mod migrate;
pub mod promo;

/// Connect to the database named by `CLI_DATABASE_URL` or `DATABASE_URL`.
pub async fn connect() -> Result<PgPool, Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    let url = std::env::var("CLI_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| "CLI_DATABASE_URL or DATABASE_URL must be set")?;

    let pool = cloudberry_commerce::db::create_pool(&SecretString::from(url)).await?;
    Ok(pool)
}
