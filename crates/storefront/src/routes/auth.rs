//! Account route handlers: register, login, logout, current user.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;

use bramble_core::models::User;

use crate::error::{ApiJson, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{AuthRejection, RequireUser, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::services::auth::{AuthError, AuthService, Registration};
use crate::state::AppState;

/// Registration request body.
///
/// A `role` field, if sent, is ignored: self-registered accounts are
/// always customers.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Login request body.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

async fn start_session(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &CurrentUser::from(user)).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Create a customer account and log it in.
#[tracing::instrument(skip_all, fields(email = %body.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let user = AuthService::new(state.storage())
        .register(Registration {
            email: body.email,
            password: body.password,
            first_name: body.first_name,
            last_name: body.last_name,
        })
        .await?;

    start_session(&session, &user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Log in with email and password.
#[tracing::instrument(skip_all, fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.storage())
        .login(&body.email, &body.password)
        .await
        .inspect_err(|e| tracing::warn!("Login failed: {}", e))?;

    start_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, "logged in");
    Ok(Json(user))
}

/// Drop the session.
pub async fn logout(session: Session) -> Result<Json<serde_json::Value>> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Json(json!({ "message": "Logged out" })))
}

/// The logged-in user's account.
pub async fn me(
    State(state): State<AppState>,
    session: Session,
    RequireUser(current): RequireUser,
) -> Result<Response> {
    match AuthService::new(state.storage()).get_user(current.id).await {
        Ok(user) => Ok(Json(user).into_response()),
        Err(AuthError::UserNotFound) => {
            // Account deleted while the session was alive.
            clear_current_user(&session).await?;
            Ok(AuthRejection::Unauthorized.into_response())
        }
        Err(e) => Err(e.into()),
    }
}
