//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request spans)
//! 3. Session layer (tower-sessions, `PostgreSQL` or memory store)
//!
//! Authentication is enforced per handler by the extractors in [`auth`].

pub mod auth;
pub mod session;

pub use auth::{
    AuthRejection, RequireAdmin, RequireUser, clear_current_user, set_current_user,
};
pub use session::{
    SESSION_COOKIE_NAME, create_session_layer, memory_session_layer, postgres_session_layer,
};
