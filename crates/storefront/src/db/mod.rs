//! `PostgreSQL` storage adapter.
//!
//! # Tables
//!
//! - `users` - Accounts (unique email, `user_role` enum)
//! - `products` - Catalog
//! - `carts` - One per user (`UNIQUE (user_id)`)
//! - `cart_items` - One row per product per cart (`UNIQUE (cart_id, product_id)`)
//! - `orders` - Placed orders (`order_status` enum)
//! - `order_items` - Frozen name/price snapshots, no FK to `products`
//! - `tower_sessions.session` - Session store
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p bramble-cli -- migrate
//! ```

mod rows;
mod storage;

use std::time::Duration;

use bramble_core::StorageError;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

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

/// [`bramble_core::Storage`] backed by a `PgPool`.
///
/// Every primitive is a single statement. The compound operations use
/// upserts or a transaction so concurrent callers cannot interleave.
#[derive(Debug, Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for sessions and migrations.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Translate a driver error into the storage taxonomy.
///
/// Unique violations become `Conflict`, foreign-key violations become
/// `InvalidReference`, pool exhaustion becomes `Unavailable`.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(ref db_err) = err {
        let constraint = db_err.constraint().unwrap_or("unknown").to_owned();
        if db_err.is_unique_violation() {
            return StorageError::Conflict(format!("unique constraint {constraint} violated"));
        }
        if db_err.is_foreign_key_violation() {
            return StorageError::InvalidReference(format!(
                "foreign key constraint {constraint} violated"
            ));
        }
    }

    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StorageError::Unavailable(err.to_string())
        }
        other => StorageError::backend(other),
    }
}
