//! Authentication extractors.
//!
//! Handlers ask for [`RequireUser`] or [`RequireAdmin`] in their signature;
//! the extractor reads [`CurrentUser`] from the session and rejects the
//! request before the handler body runs.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};

/// Extractor that requires a logged-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireUser(user): RequireUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

/// Extractor that requires a logged-in user with the admin role.
pub struct RequireAdmin(pub CurrentUser);

/// Why an authenticated extractor refused the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No session, or nobody logged in.
    Unauthorized,
    /// Logged in without the required role.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Not authenticated"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Not authorized"),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

async fn current_user(parts: &Parts) -> Option<CurrentUser> {
    // Set by SessionManagerLayer
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_user(parts)
            .await
            .map(Self)
            .ok_or(AuthRejection::Unauthorized)
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = current_user(parts)
            .await
            .ok_or(AuthRejection::Unauthorized)?;

        if user.role.is_admin() {
            Ok(Self(user))
        } else {
            tracing::warn!(user_id = %user.id, "admin route refused");
            Err(AuthRejection::Forbidden)
        }
    }
}

/// Store the logged-in user in the session.
///
/// Cycles the session id first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Clear the whole session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
