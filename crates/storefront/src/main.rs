//! Bramble Storefront - JSON shop API.
//!
//! This binary serves the catalog, cart and order API on port 3000.
//!
//! # Architecture
//!
//! - Axum web framework, JSON in and out
//! - Storage behind the `bramble_core::Storage` port, either `PostgreSQL`
//!   or process memory (`BRAMBLE_STORAGE`)
//! - Cookie sessions via tower-sessions, stored alongside the data
//!
//! Migrations are NOT run on startup. Run them explicitly via:
//! `cargo run -p bramble-cli -- migrate`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use bramble_core::MemoryStorage;
use bramble_storefront::config::{StorageConfig, StorefrontConfig};
use bramble_storefront::db::{self, PgStorage};
use bramble_storefront::middleware::{memory_session_layer, postgres_session_layer};
use bramble_storefront::routes;
use bramble_storefront::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry.dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry
                .environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry.sample_rate,
            traces_sample_rate: config.sentry.traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bramble_storefront=info,bramble_core=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    tracing::info!(backend = %config.storage.backend(), "storage selected");

    let app = match &config.storage {
        StorageConfig::Postgres { database_url } => {
            let pool = db::create_pool(database_url)
                .await
                .expect("Failed to create database pool");
            tracing::info!("Database pool created");

            let session_layer = postgres_session_layer(&pool, &config);
            let state = AppState::new(config.clone(), Arc::new(PgStorage::new(pool)));
            routes::app(state, session_layer)
        }
        StorageConfig::Memory => {
            tracing::warn!("Using in-memory storage; all data is lost on exit");
            let session_layer = memory_session_layer(&config);
            let state = AppState::new(config.clone(), Arc::new(MemoryStorage::new()));
            routes::app(state, session_layer)
        }
    };

    let addr = config.socket_addr();
    tracing::info!("storefront listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
