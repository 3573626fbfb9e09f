//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                    - Liveness
//! GET    /health/ready              - Storage readiness (200 / 503)
//!
//! # Auth
//! POST   /api/auth/register         - Create customer account and log in
//! POST   /api/auth/login            - Email + password login
//! POST   /api/auth/logout           - Clear session
//! GET    /api/auth/me               - Current user
//!
//! # Products (writes require admin)
//! GET    /api/products              - List (?limit&offset)
//! POST   /api/products              - Create
//! GET    /api/products/{id}         - Detail
//! PUT    /api/products/{id}         - Partial update
//! DELETE /api/products/{id}         - Delete
//!
//! # Cart (requires auth)
//! GET    /api/cart                  - Cart with items
//! POST   /api/cart/items            - Add or merge
//! PUT    /api/cart/items/{id}       - Set quantity
//! DELETE /api/cart/items/{id}       - Remove
//!
//! # Orders (requires auth)
//! POST   /api/orders                - Check out the cart
//! GET    /api/orders                - Own orders (admins: all)
//! GET    /api/orders/{id}           - Order with items
//! PUT    /api/orders/{id}/status    - Change status (admin)
//! ```

pub mod auth;
pub mod cart;
pub mod orders;
pub mod products;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/items", post(cart::add_item))
        .route(
            "/items/{id}",
            put(cart::update_item).delete(cart::remove_item),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::create))
        .route("/{id}", get(orders::show))
        .route("/{id}/status", put(orders::update_status))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/auth", auth_routes())
        .nest("/api/products", product_routes())
        .nest("/api/cart", cart_routes())
        .nest("/api/orders", order_routes())
}

/// Assemble the full application with sessions, tracing and Sentry layers.
pub fn app<S>(state: AppState, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    routes()
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if storage cannot be reached.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.storage().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!("Readiness check failed: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
