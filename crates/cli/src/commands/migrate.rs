//! Database migration command.

/// Run the commerce schema migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    tracing::info!("Running commerce migrations");
    cloudberry_commerce::db::migrator().run(&pool).await?;
    tracing::info!("Migrations complete");

    Ok(())
}
