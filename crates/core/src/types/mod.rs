//! Core value types for Bramble.
//!
//! Type-safe wrappers for identifiers, email addresses and enums.

pub mod email;
pub mod id;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use status::{OrderStatus, ParseEnumError, Role};
