//! Bramble Storefront library.
//!
//! The JSON API server as a library, so the binary, the CLI and the
//! integration tests all build the same router and storage adapter.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
