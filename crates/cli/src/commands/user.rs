//! User management commands.

use bramble_core::Role;
use bramble_storefront::services::auth::{AuthService, Registration};

use super::{CliError, connect_storage};

/// Create a user with the given role.
///
/// This is the only way to create an admin: public registration always
/// yields customers.
///
/// # Errors
///
/// Returns an error if the input fails validation, the email is taken, or
/// the database is unreachable.
pub async fn create(
    email: String,
    password: String,
    first_name: String,
    last_name: String,
    role: Role,
) -> Result<(), CliError> {
    let storage = connect_storage().await?;

    let user = AuthService::new(&storage)
        .create_account(
            Registration {
                email,
                password,
                first_name,
                last_name,
            },
            role,
        )
        .await?;

    tracing::info!(user_id = %user.id, email = %user.email, role = %user.role, "User created");
    Ok(())
}
