//! Cart rules layered over the storage port.
//!
//! Every function takes the acting user's id and only ever touches that
//! user's cart. An item id belonging to someone else's cart is reported as
//! [`CartError::ItemNotFound`], the same as an id that does not exist.

use serde::Serialize;

use crate::models::{Cart, CartItem, NewCartItem, validate_quantity};
use crate::storage::{MergedCartItem, Storage, StorageError};
use crate::types::{CartItemId, ProductId, UserId};
use crate::validation::ValidationError;

/// Errors from cart operations.
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("cart item {0} not found")]
    ItemNotFound(CartItemId),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A cart with its lines, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartContents {
    pub cart: Cart,
    pub items: Vec<CartItem>,
}

/// Load the user's cart, creating an empty one on first access.
///
/// # Errors
///
/// Returns [`CartError::Storage`] if the backend fails.
#[tracing::instrument(skip(storage))]
pub async fn load(storage: &dyn Storage, user_id: UserId) -> Result<CartContents, CartError> {
    let cart = storage.get_or_create_cart(user_id).await?;
    let items = storage.list_cart_items(cart.id).await?;
    Ok(CartContents { cart, items })
}

/// Add `quantity` units of a product to the user's cart.
///
/// A product already in the cart has its line incremented instead of gaining
/// a second line. The returned flag tells the two cases apart.
///
/// # Errors
///
/// - [`CartError::Validation`] if `quantity` is below 1
/// - [`CartError::ProductNotFound`] if the product does not exist
/// - [`CartError::Storage`] if the backend fails
#[tracing::instrument(skip(storage))]
pub async fn add_to_cart(
    storage: &dyn Storage,
    user_id: UserId,
    product_id: ProductId,
    quantity: i32,
) -> Result<MergedCartItem, CartError> {
    validate_quantity(quantity)?;

    if storage.get_product(product_id).await?.is_none() {
        return Err(CartError::ProductNotFound(product_id));
    }

    let cart = storage.get_or_create_cart(user_id).await?;
    let merged = storage
        .merge_cart_item(NewCartItem {
            cart_id: cart.id,
            product_id,
            quantity,
        })
        .await
        .map_err(|err| match err {
            // Product deleted between the lookup and the insert.
            StorageError::InvalidReference(_) => CartError::ProductNotFound(product_id),
            other => CartError::Storage(other),
        })?;

    tracing::debug!(
        cart_item_id = %merged.item.id,
        quantity = merged.item.quantity,
        created = merged.created,
        "cart line merged"
    );
    Ok(merged)
}

/// Set the quantity of one of the user's cart lines.
///
/// # Errors
///
/// - [`CartError::Validation`] if `quantity` is below 1
/// - [`CartError::ItemNotFound`] if the item is missing or not in the user's cart
/// - [`CartError::Storage`] if the backend fails
#[tracing::instrument(skip(storage))]
pub async fn update_quantity(
    storage: &dyn Storage,
    user_id: UserId,
    item_id: CartItemId,
    quantity: i32,
) -> Result<CartItem, CartError> {
    validate_quantity(quantity)?;
    owned_item(storage, user_id, item_id).await?;

    storage
        .update_cart_item(item_id, quantity)
        .await?
        .ok_or(CartError::ItemNotFound(item_id))
}

/// Remove one of the user's cart lines.
///
/// # Errors
///
/// - [`CartError::ItemNotFound`] if the item is missing or not in the user's cart
/// - [`CartError::Storage`] if the backend fails
#[tracing::instrument(skip(storage))]
pub async fn remove_item(
    storage: &dyn Storage,
    user_id: UserId,
    item_id: CartItemId,
) -> Result<(), CartError> {
    owned_item(storage, user_id, item_id).await?;

    if storage.remove_cart_item(item_id).await? {
        Ok(())
    } else {
        Err(CartError::ItemNotFound(item_id))
    }
}

async fn owned_item(
    storage: &dyn Storage,
    user_id: UserId,
    item_id: CartItemId,
) -> Result<CartItem, CartError> {
    let Some(cart) = storage.get_cart(user_id).await? else {
        return Err(CartError::ItemNotFound(item_id));
    };

    match storage.get_cart_item(item_id).await? {
        Some(item) if item.cart_id == cart.id => Ok(item),
        _ => Err(CartError::ItemNotFound(item_id)),
    }
}
