//! Session middleware configuration.
//!
//! Sessions live in `PostgreSQL` when the storefront runs on the database
//! backend, and in process memory otherwise.

use sqlx::PgPool;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "bramble_session";

/// Session expiry time in seconds (30 days).
const SESSION_EXPIRY_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Create the session layer with a `PostgreSQL` store.
///
/// The `tower_sessions.session` table is created by the migrations.
#[must_use]
pub fn postgres_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> SessionManagerLayer<PostgresStore> {
    create_session_layer(PostgresStore::new(pool.clone()), config)
}

/// Create the session layer with an in-process store.
#[must_use]
pub fn memory_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MemoryStore> {
    create_session_layer(MemoryStore::default(), config)
}

/// Apply the cookie settings to any store.
#[must_use]
pub fn create_session_layer<S>(store: S, config: &StorefrontConfig) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_https())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
