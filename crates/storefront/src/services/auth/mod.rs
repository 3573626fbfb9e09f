//! Authentication service.
//!
//! Password registration and login on top of the storage port. Hashes are
//! Argon2id in PHC string format.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use bramble_core::models::{NewUser, User};
use bramble_core::{Email, Role, Storage, StorageError, UserId};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Profile and credentials for a new account.
#[derive(Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish()
    }
}

/// Authentication service.
///
/// Handles user registration and login.
pub struct AuthService<'a> {
    storage: &'a dyn Storage,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(storage: &'a dyn Storage) -> Self {
        Self { storage }
    }

    /// Register a new customer account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::Validation` if a name is too short or too long.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, registration: Registration) -> Result<User, AuthError> {
        self.create_account(registration, Role::Customer).await
    }

    /// Create an account with an explicit role.
    ///
    /// Public registration always goes through [`AuthService::register`];
    /// this is for operator tooling.
    ///
    /// # Errors
    ///
    /// Same as [`AuthService::register`].
    #[tracing::instrument(skip(self), fields(email = %registration.email))]
    pub async fn create_account(
        &self,
        registration: Registration,
        role: Role,
    ) -> Result<User, AuthError> {
        let email = Email::parse(&registration.email)?;
        validate_password(&registration.password)?;

        let new_user = NewUser {
            email,
            password_hash: hash_password(&registration.password)?,
            first_name: registration.first_name,
            last_name: registration.last_name,
            role: Some(role),
        };
        new_user.validate()?;

        let user = self
            .storage
            .create_user(new_user)
            .await
            .map_err(|e| match e {
                StorageError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Storage(other),
            })?;

        tracing::info!(user_id = %user.id, role = %user.role, "account created");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        // A malformed address cannot belong to anyone.
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .storage
            .get_user_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &user.password_hash)?;

        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.storage
            .get_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
