//! Storefront-only models.
//!
//! Entities live in `bramble_core::models`; this module holds session state.

pub mod session;

pub use session::{CurrentUser, keys as session_keys};
