//! Database migration command.
//!
//! Applies `crates/storefront/migrations/` in order. Already-applied
//! migrations are skipped, so running it twice is harmless.

use super::{CliError, connect};

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails,
/// or a migration fails to apply.
pub async fn run() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
