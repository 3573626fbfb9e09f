//! Subcommand implementations.

pub mod migrate;
pub mod seed;
pub mod user;

use bramble_core::{StorageError, ValidationError};
use bramble_storefront::db::{self, PgStorage};
use bramble_storefront::services::auth::AuthError;
use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors surfaced by any subcommand.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Read the database URL, preferring `BRAMBLE_DATABASE_URL`.
fn database_url() -> Result<SecretString, CliError> {
    dotenvy::dotenv().ok();

    std::env::var("BRAMBLE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|url| !url.trim().is_empty())
        .map(SecretString::from)
        .ok_or(CliError::MissingEnvVar("BRAMBLE_DATABASE_URL"))
}

/// Connect using the storefront's pool settings.
async fn connect() -> Result<PgPool, CliError> {
    let pool = db::create_pool(&database_url()?).await?;
    tracing::info!("Connected to database");
    Ok(pool)
}

/// Connect and wrap the pool in the storage adapter.
async fn connect_storage() -> Result<PgStorage, CliError> {
    Ok(PgStorage::new(connect().await?))
}
