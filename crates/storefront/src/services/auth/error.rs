//! Authentication error types.

use thiserror::Error;

use bramble_core::{StorageError, ValidationError};

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] bramble_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Profile fields broke a rule.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
