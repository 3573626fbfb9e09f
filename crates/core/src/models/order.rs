//! Orders and their frozen line items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{OrderId, OrderItemId, OrderStatus, ProductId, UserId};
use crate::validation::{self, ValidationError};

const ADDRESS_MIN: usize = 5;
const PAYMENT_METHOD_MIN: usize = 3;
const ITEM_NAME_MIN: usize = 3;
const ITEM_NAME_MAX: usize = 100;

/// A placed order. Only `status` (and `updated_at`) change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total: Decimal,
    pub shipping_address: String,
    pub billing_address: String,
    pub payment_method: String,
    pub status: OrderStatus,
    pub is_paid: bool,
    /// Creation time when the order was paid on creation, otherwise `None`.
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert shape for [`Order`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub user_id: UserId,
    pub total: Decimal,
    pub shipping_address: String,
    pub billing_address: String,
    pub payment_method: String,
    /// `None` stores [`OrderStatus::Pending`].
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub is_paid: bool,
}

impl NewOrder {
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::non_negative_amount("total", self.total)?;
        validation::length("shippingAddress", &self.shipping_address, ADDRESS_MIN, None)?;
        validation::length("billingAddress", &self.billing_address, ADDRESS_MIN, None)?;
        validation::length(
            "paymentMethod",
            &self.payment_method,
            PAYMENT_METHOD_MIN,
            None,
        )
    }

    /// The status that will be stored.
    #[must_use]
    pub fn status(&self) -> OrderStatus {
        self.status.unwrap_or_default()
    }
}

/// A line of an order. `name` and `price` are copies taken when the order
/// was placed and never follow later product edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

/// Insert shape for [`OrderItem`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
}

impl NewOrderItem {
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_line(&self.name, self.price, self.quantity)
    }
}

/// An order line before its order exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
}

impl OrderLine {
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_line(&self.name, self.price, self.quantity)
    }

    /// `price * quantity`, or `None` if the product does not fit a `Decimal`.
    #[must_use]
    pub fn subtotal(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }

    /// Attach the line to a created order.
    #[must_use]
    pub fn into_new_item(self, order_id: OrderId) -> NewOrderItem {
        NewOrderItem {
            order_id,
            product_id: self.product_id,
            name: self.name,
            price: self.price,
            quantity: self.quantity,
        }
    }
}

/// An order together with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

fn validate_line(name: &str, price: Decimal, quantity: i32) -> Result<(), ValidationError> {
    validation::length("name", name, ITEM_NAME_MIN, Some(ITEM_NAME_MAX))?;
    validation::positive_amount("price", price)?;
    validation::positive_count("quantity", quantity)
}
