//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`. Every error body is `{"message": "..."}`.

use axum::{
    Json,
    extract::{FromRequest, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use bramble_core::cart::CartError;
use bramble_core::checkout::CheckoutError;
use bramble_core::{StorageError, ValidationError};

use crate::services::auth::AuthError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Input broke a field rule.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Request body was not valid JSON for the endpoint.
    #[error("Invalid request body: {0}")]
    Json(#[from] JsonRejection),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

const INTERNAL_MESSAGE: &str = "Internal server error";
const VALIDATION_MESSAGE: &str = "Validation error";

fn storage_status(err: &StorageError) -> StatusCode {
    match err {
        StorageError::Conflict(_) | StorageError::InvalidReference(_) => StatusCode::CONFLICT,
        StorageError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        StorageError::DataCorruption(_) | StorageError::Backend(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn storage_message(err: &StorageError) -> String {
    match err {
        StorageError::Conflict(_) => "Resource already exists".to_string(),
        StorageError::InvalidReference(_) => "Resource is still referenced".to_string(),
        StorageError::Unavailable(_) => "Service unavailable".to_string(),
        StorageError::DataCorruption(_) | StorageError::Backend(_) => INTERNAL_MESSAGE.to_string(),
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Json(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Storage(err) => storage_status(err),
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::Validation(_) => StatusCode::BAD_REQUEST,
                AuthError::Storage(err) => storage_status(err),
                AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Cart(err) => match err {
                CartError::ProductNotFound(_) | CartError::ItemNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                CartError::Validation(_) => StatusCode::BAD_REQUEST,
                CartError::Storage(err) => storage_status(err),
            },
            Self::Checkout(err) => match err {
                CheckoutError::EmptyCart | CheckoutError::Validation(_) => StatusCode::BAD_REQUEST,
                CheckoutError::ProductUnavailable(_) => StatusCode::CONFLICT,
                CheckoutError::Storage(err) => storage_status(err),
            },
        }
    }

    /// Client-facing message. Internal details are never exposed.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Session(_) => INTERNAL_MESSAGE.to_string(),
            Self::Storage(err)
            | Self::Auth(AuthError::Storage(err))
            | Self::Cart(CartError::Storage(err))
            | Self::Checkout(CheckoutError::Storage(err)) => storage_message(err),
            Self::Validation(_)
            | Self::Auth(
                AuthError::Validation(_) | AuthError::InvalidEmail(_) | AuthError::WeakPassword(_),
            )
            | Self::Cart(CartError::Validation(_))
            | Self::Checkout(CheckoutError::Validation(_)) => VALIDATION_MESSAGE.to_string(),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid email or password".to_string(),
                AuthError::UserAlreadyExists => {
                    "An account with this email already exists".to_string()
                }
                AuthError::UserNotFound => "User not found".to_string(),
                _ => INTERNAL_MESSAGE.to_string(),
            },
            Self::Cart(err) => match err {
                CartError::ProductNotFound(_) => "Product not found".to_string(),
                CartError::ItemNotFound(_) => "Cart item not found".to_string(),
                _ => INTERNAL_MESSAGE.to_string(),
            },
            Self::Checkout(err) => err.to_string(),
            Self::Json(rejection) => rejection.body_text(),
            Self::NotFound(what) => format!("{what} not found"),
        }
    }

    /// The rejected field and the rule it broke, for input errors.
    #[must_use]
    pub fn field_error(&self) -> Option<(&'static str, String)> {
        match self {
            Self::Validation(err)
            | Self::Auth(AuthError::Validation(err))
            | Self::Cart(CartError::Validation(err))
            | Self::Checkout(CheckoutError::Validation(err)) => Some((err.field(), err.to_string())),
            Self::Auth(AuthError::InvalidEmail(err)) => Some(("email", err.to_string())),
            Self::Auth(AuthError::WeakPassword(msg)) => Some(("password", msg.clone())),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = match self.field_error() {
            Some((field, message)) => json!({
                "message": self.public_message(),
                "errors": [{ "field": field, "message": message }],
            }),
            None => json!({ "message": self.public_message() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// `Json` extractor whose rejections render as [`AppError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, String)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb
            .data
            .insert((*key).to_string(), serde_json::Value::String(value.clone()));
    }

    sentry::add_breadcrumb(breadcrumb);
}
