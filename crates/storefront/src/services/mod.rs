//! Business logic services for storefront.
//!
//! Cart and checkout rules live in `bramble_core`; this module holds what
//! only the server needs.
//!
//! # Services
//!
//! - `auth` - Password registration and login

pub mod auth;
