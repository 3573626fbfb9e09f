//! Turning a cart into an order.
//!
//! Order lines copy each product's name and price at the moment of checkout.
//! Later product edits or deletes never reach an existing order.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::{NewOrder, OrderLine, OrderWithItems};
use crate::storage::{Storage, StorageError};
use crate::types::{ProductId, UserId};
use crate::validation::{MONEY_LIMIT, ValidationError};

/// Payment and delivery details supplied at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutDetails {
    pub shipping_address: String,
    /// Defaults to the shipping address.
    #[serde(default)]
    pub billing_address: Option<String>,
    pub payment_method: String,
    #[serde(default)]
    pub is_paid: bool,
}

/// Errors from placing an order.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("product {0} is no longer available")]
    ProductUnavailable(ProductId),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Place an order for everything in the user's cart.
///
/// The cart is left as it is.
///
/// # Errors
///
/// - [`CheckoutError::EmptyCart`] if the user has no cart or it has no lines
/// - [`CheckoutError::ProductUnavailable`] if a line's product was deleted
/// - [`CheckoutError::Validation`] if the details or a snapshot break a rule
/// - [`CheckoutError::Storage`] if the backend fails
#[tracing::instrument(skip(storage, details))]
pub async fn place_order(
    storage: &dyn Storage,
    user_id: UserId,
    details: CheckoutDetails,
) -> Result<OrderWithItems, CheckoutError> {
    let Some(cart) = storage.get_cart(user_id).await? else {
        return Err(CheckoutError::EmptyCart);
    };

    let items = storage.list_cart_items(cart.id).await?;
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let product = storage
            .get_product(item.product_id)
            .await?
            .ok_or(CheckoutError::ProductUnavailable(item.product_id))?;
        lines.push(OrderLine {
            product_id: product.id,
            name: product.name,
            price: product.price,
            quantity: item.quantity,
        });
    }

    place_order_from_lines(storage, user_id, details, lines).await
}

/// Place an order from explicit lines, bypassing the cart.
///
/// The total is the sum of `price * quantity` over all lines. Order and
/// lines are written in one storage call.
///
/// # Errors
///
/// - [`CheckoutError::EmptyCart`] if `lines` is empty
/// - [`CheckoutError::Validation`] if the details or a line break a rule
/// - [`CheckoutError::Storage`] if the backend fails
#[tracing::instrument(skip(storage, details, lines), fields(lines = lines.len()))]
pub async fn place_order_from_lines(
    storage: &dyn Storage,
    user_id: UserId,
    details: CheckoutDetails,
    lines: Vec<OrderLine>,
) -> Result<OrderWithItems, CheckoutError> {
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    for line in &lines {
        line.validate()?;
    }

    let total = order_total(&lines)?;
    let billing_address = details
        .billing_address
        .unwrap_or_else(|| details.shipping_address.clone());
    let order = NewOrder {
        user_id,
        total,
        shipping_address: details.shipping_address,
        billing_address,
        payment_method: details.payment_method,
        status: None,
        is_paid: details.is_paid,
    };
    order.validate()?;

    let placed = storage.create_order_with_items(order, lines).await?;
    tracing::info!(
        order_id = %placed.order.id,
        total = %placed.order.total,
        items = placed.items.len(),
        "order placed"
    );
    Ok(placed)
}

/// Sum of line subtotals. Fails instead of overflowing.
fn order_total(lines: &[OrderLine]) -> Result<Decimal, ValidationError> {
    lines.iter().try_fold(Decimal::ZERO, |total, line| {
        line.subtotal()
            .and_then(|subtotal| total.checked_add(subtotal))
            .ok_or(ValidationError::TooLarge {
                field: "total",
                limit: MONEY_LIMIT,
            })
    })
}
