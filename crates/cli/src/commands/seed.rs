//! Seed the database with fixture accounts and a sample catalog.
//!
//! Safe to run repeatedly: existing accounts are left alone and products
//! are only added to an empty catalog.

use bramble_core::models::NewProduct;
use bramble_core::{Pagination, Role, Storage};
use bramble_storefront::services::auth::{AuthError, AuthService, Registration};
use rust_decimal::Decimal;

use super::{CliError, connect_storage};

const FIXTURE_PASSWORD: &str = "test_password";

/// Fixture accounts: (email, first name, last name, role).
const FIXTURE_USERS: [(&str, &str, &str, Role); 2] = [
    ("test_admin@example.com", "Admin", "User", Role::Admin),
    ("test_customer@example.com", "Customer", "User", Role::Customer),
];

/// Sample catalog: (name, description, price in cents, stock).
const SAMPLE_PRODUCTS: [(&str, &str, i64, i32); 3] = [
    (
        "Bramble Jam",
        "Small-batch blackberry jam, 250g jar.",
        650,
        40,
    ),
    (
        "Hedgerow Tea",
        "Loose-leaf blend of blackberry leaf and rosehip.",
        899,
        25,
    ),
    (
        "Foraging Basket",
        "Hand-woven willow basket with a linen liner.",
        3450,
        5,
    ),
];

/// Seed fixture users and products.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a write fails for a
/// reason other than the row already existing.
pub async fn run() -> Result<(), CliError> {
    let storage = connect_storage().await?;

    seed_users(&storage).await?;
    seed_products(&storage).await?;

    tracing::info!("Seed completed successfully");
    Ok(())
}

async fn seed_users(storage: &dyn Storage) -> Result<(), CliError> {
    let auth = AuthService::new(storage);

    for (email, first_name, last_name, role) in FIXTURE_USERS {
        let registration = Registration {
            email: email.to_string(),
            password: FIXTURE_PASSWORD.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        };

        match auth.create_account(registration, role).await {
            Ok(user) => tracing::info!(user_id = %user.id, %email, "User created"),
            Err(AuthError::UserAlreadyExists) => tracing::info!(%email, "User already exists"),
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

async fn seed_products(storage: &dyn Storage) -> Result<(), CliError> {
    if !storage
        .list_products(Pagination::new(1, 0))
        .await?
        .is_empty()
    {
        tracing::info!("Catalog not empty, skipping sample products");
        return Ok(());
    }

    for (name, description, cents, stock) in SAMPLE_PRODUCTS {
        let product = NewProduct {
            name: name.to_string(),
            description: description.to_string(),
            price: Decimal::new(cents, 2),
            image_url: None,
            stock,
        };
        product.validate()?;

        let product = storage.create_product(product).await?;
        tracing::info!(product_id = %product.id, name = %product.name, "Product created");
    }

    Ok(())
}
