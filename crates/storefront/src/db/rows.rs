//! Internal row types and their conversion into core entities.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use bramble_core::models::{Cart, CartItem, Order, OrderItem, Product, User};
use bramble_core::{
    CartId, CartItemId, Email, OrderId, OrderItemId, OrderStatus, ProductId, Role, StorageError,
    UserId,
};

#[derive(Debug, sqlx::FromRow)]
pub(super) struct UserRow {
    id: i32,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    role: Role,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StorageError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            StorageError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            role: row.role,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ProductRow {
    id: i32,
    name: String,
    description: String,
    price: Decimal,
    image_url: Option<String>,
    stock: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            description: row.description,
            price: row.price,
            image_url: row.image_url,
            stock: row.stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct CartRow {
    id: i32,
    user_id: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            id: CartId::new(row.id),
            user_id: UserId::new(row.user_id),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct CartItemRow {
    id: i32,
    cart_id: i32,
    product_id: i32,
    quantity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> Self {
        Self {
            id: CartItemId::new(row.id),
            cart_id: CartId::new(row.cart_id),
            product_id: ProductId::new(row.product_id),
            quantity: row.quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Cart item upsert result. `inserted` is `xmax = 0` on the returned row.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct MergedCartItemRow {
    #[sqlx(flatten)]
    pub(super) item: CartItemRow,
    pub(super) inserted: bool,
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct OrderRow {
    id: i32,
    user_id: i32,
    total: Decimal,
    shipping_address: String,
    billing_address: String,
    payment_method: String,
    status: OrderStatus,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            total: row.total,
            shipping_address: row.shipping_address,
            billing_address: row.billing_address,
            payment_method: row.payment_method,
            status: row.status,
            is_paid: row.is_paid,
            paid_at: row.paid_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct OrderItemRow {
    id: i32,
    order_id: i32,
    product_id: i32,
    name: String,
    price: Decimal,
    quantity: i32,
    created_at: DateTime<Utc>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: OrderItemId::new(row.id),
            order_id: OrderId::new(row.order_id),
            product_id: ProductId::new(row.product_id),
            name: row.name,
            price: row.price,
            quantity: row.quantity,
            created_at: row.created_at,
        }
    }
}
