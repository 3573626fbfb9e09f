//! Bramble Core - domain model and storage port.
//!
//! This crate is shared by every Bramble component:
//! - `storefront` - JSON API server
//! - `cli` - migrations, seeding and account management
//!
//! # Architecture
//!
//! Core holds the entity model, input validation, the [`Storage`] port with
//! its in-memory adapter, and the cart/checkout rules built on top of the
//! port. It does no network or database I/O. The `postgres` feature only
//! adds `sqlx` type mappings so the storefront's adapter can decode rows
//! straight into core types.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, validated email, role and order status
//! - [`models`] - Entities plus their insert and update shapes
//! - [`validation`] - Field rules and [`ValidationError`]
//! - [`storage`] - The [`Storage`] trait and [`MemoryStorage`]
//! - [`cart`] - Get-or-create, add-to-cart merge, ownership-checked edits
//! - [`checkout`] - Snapshotting a cart into an order

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod models;
pub mod storage;
pub mod types;
pub mod validation;

pub use storage::{MemoryStorage, Pagination, Storage, StorageError, StorageResult};
pub use types::*;
pub use validation::ValidationError;
