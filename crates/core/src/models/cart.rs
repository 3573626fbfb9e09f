//! Shopping carts and their line items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CartId, CartItemId, ProductId, UserId};
use crate::validation::{self, ValidationError};

/// A user's cart. Created lazily, at most one per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert shape for [`Cart`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCart {
    pub user_id: UserId,
}

/// One product line in a cart. `quantity` is always at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert shape for [`CartItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCartItem {
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: i32,
}

impl NewCartItem {
    /// # Errors
    ///
    /// Returns [`ValidationError::NotPositive`] for a quantity below 1.
    pub const fn validate(&self) -> Result<(), ValidationError> {
        validate_quantity(self.quantity)
    }
}

/// Quantity rule shared by inserts and quantity changes.
///
/// # Errors
///
/// Returns [`ValidationError::NotPositive`] for a quantity below 1.
pub const fn validate_quantity(quantity: i32) -> Result<(), ValidationError> {
    validation::positive_count("quantity", quantity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_must_be_positive() {
        let item = NewCartItem {
            cart_id: CartId::new(1),
            product_id: ProductId::new(1),
            quantity: 0,
        };
        assert_eq!(
            item.validate(),
            Err(ValidationError::NotPositive { field: "quantity" })
        );
        assert!(validate_quantity(3).is_ok());
    }
}
