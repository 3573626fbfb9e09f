//! The storage port.
//!
//! [`Storage`] lists every persistence operation the rest of the system may
//! invoke. Two adapters implement it: [`MemoryStorage`] here, and the
//! `PostgreSQL` adapter in the storefront crate. Callers hold an
//! `Arc<dyn Storage>` and never know which one they have.
//!
//! # Contract
//!
//! - Lookups return `Ok(None)` for a missing row; not-found is never an error.
//! - Deletes return `Ok(false)` when nothing was removed.
//! - Updates on a missing id return `Ok(None)`.
//! - `list_*` apply `offset`, then `limit`, in insertion order. An offset past
//!   the end yields an empty vector.
//! - [`StorageError`] means the backend itself failed or refused the write
//!   (constraint violation, lost connection).
//! - Inputs are assumed validated; adapters do not re-check field rules.

mod memory;

pub use memory::MemoryStorage;

use async_trait::async_trait;
use serde::Deserialize;

use crate::models::{
    Cart, CartItem, NewCart, NewCartItem, NewOrder, NewOrderItem, NewProduct, NewUser, Order,
    OrderItem, OrderLine, OrderWithItems, Product, ProductUpdate, User, UserUpdate,
};
use crate::types::{CartId, CartItemId, Email, OrderId, OrderStatus, ProductId, UserId};

/// Default page size for `list_*` operations.
pub const DEFAULT_LIMIT: u32 = 10;

/// Offset/limit window for list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

const fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Pagination {
    #[must_use]
    pub const fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }

    /// Apply the window to an already ordered sequence, cloning the kept rows.
    pub fn window<'a, T, I>(self, rows: I) -> Vec<T>
    where
        T: Clone + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        rows.into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .cloned()
            .collect()
    }
}

/// Errors raised by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A uniqueness constraint rejected the write (duplicate email, second
    /// cart for a user, duplicate product line in a cart).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The write references a row that does not exist, or removing the row
    /// would orphan dependents.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// A stored value could not be turned back into a domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The backend cannot serve requests (poisoned lock, closed pool).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StorageError {
    /// Wrap an arbitrary backend error.
    pub fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Backend(err.into())
    }
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome of [`Storage::merge_cart_item`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedCartItem {
    pub item: CartItem,
    /// `true` when a new row was inserted, `false` when an existing row's
    /// quantity was incremented.
    pub created: bool,
}

/// Persistence operations, independent of backend.
#[async_trait]
pub trait Storage: Send + Sync {
    // =========================================================================
    // Users
    // =========================================================================

    async fn list_users(&self, page: Pagination) -> StorageResult<Vec<User>>;
    async fn get_user(&self, id: UserId) -> StorageResult<Option<User>>;
    async fn get_user_by_email(&self, email: &Email) -> StorageResult<Option<User>>;
    async fn create_user(&self, user: NewUser) -> StorageResult<User>;
    async fn update_user(&self, id: UserId, update: UserUpdate) -> StorageResult<Option<User>>;
    async fn delete_user(&self, id: UserId) -> StorageResult<bool>;

    // =========================================================================
    // Products
    // =========================================================================

    async fn list_products(&self, page: Pagination) -> StorageResult<Vec<Product>>;
    async fn get_product(&self, id: ProductId) -> StorageResult<Option<Product>>;
    async fn create_product(&self, product: NewProduct) -> StorageResult<Product>;
    /// Bumps `updated_at` on success.
    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> StorageResult<Option<Product>>;
    async fn delete_product(&self, id: ProductId) -> StorageResult<bool>;

    // =========================================================================
    // Carts
    // =========================================================================

    async fn get_cart(&self, user_id: UserId) -> StorageResult<Option<Cart>>;
    async fn create_cart(&self, cart: NewCart) -> StorageResult<Cart>;

    // =========================================================================
    // Cart items
    // =========================================================================

    async fn list_cart_items(&self, cart_id: CartId) -> StorageResult<Vec<CartItem>>;
    async fn get_cart_item(&self, id: CartItemId) -> StorageResult<Option<CartItem>>;
    async fn add_cart_item(&self, item: NewCartItem) -> StorageResult<CartItem>;
    async fn update_cart_item(
        &self,
        id: CartItemId,
        quantity: i32,
    ) -> StorageResult<Option<CartItem>>;
    async fn remove_cart_item(&self, id: CartItemId) -> StorageResult<bool>;

    // =========================================================================
    // Orders
    // =========================================================================

    /// Orders of one user when `user_id` is set, otherwise all orders.
    async fn list_orders(
        &self,
        user_id: Option<UserId>,
        page: Pagination,
    ) -> StorageResult<Vec<Order>>;
    async fn get_order(&self, id: OrderId) -> StorageResult<Option<Order>>;
    /// Sets `paid_at` to the creation time when `is_paid` is true.
    async fn create_order(&self, order: NewOrder) -> StorageResult<Order>;
    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> StorageResult<Option<Order>>;

    // =========================================================================
    // Order items
    // =========================================================================

    async fn list_order_items(&self, order_id: OrderId) -> StorageResult<Vec<OrderItem>>;
    async fn create_order_item(&self, item: NewOrderItem) -> StorageResult<OrderItem>;

    /// Readiness probe. Backends with a connection override this.
    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }

    // =========================================================================
    // Compound operations
    //
    // The default bodies compose the primitives above and are only as atomic
    // as those calls. Adapters override them with single-step versions.
    // =========================================================================

    /// Return the user's cart, creating it on first access.
    async fn get_or_create_cart(&self, user_id: UserId) -> StorageResult<Cart> {
        if let Some(cart) = self.get_cart(user_id).await? {
            return Ok(cart);
        }
        match self.create_cart(NewCart { user_id }).await {
            Ok(cart) => Ok(cart),
            // Lost a race against another first access.
            Err(StorageError::Conflict(_)) => self.get_cart(user_id).await?.ok_or_else(|| {
                StorageError::DataCorruption(format!("cart for user {user_id} vanished"))
            }),
            Err(err) => Err(err),
        }
    }

    /// Insert a cart line, or add to the quantity of the line that already
    /// holds the same product.
    async fn merge_cart_item(&self, item: NewCartItem) -> StorageResult<MergedCartItem> {
        let existing = self
            .list_cart_items(item.cart_id)
            .await?
            .into_iter()
            .find(|line| line.product_id == item.product_id);

        if let Some(existing) = existing {
            let quantity = existing.quantity.saturating_add(item.quantity);
            if let Some(updated) = self.update_cart_item(existing.id, quantity).await? {
                return Ok(MergedCartItem {
                    item: updated,
                    created: false,
                });
            }
        }

        let created = self.add_cart_item(item).await?;
        Ok(MergedCartItem {
            item: created,
            created: true,
        })
    }

    /// Create an order and all of its lines.
    async fn create_order_with_items(
        &self,
        order: NewOrder,
        lines: Vec<OrderLine>,
    ) -> StorageResult<OrderWithItems> {
        let order = self.create_order(order).await?;
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            items.push(self.create_order_item(line.into_new_item(order.id)).await?);
        }
        Ok(OrderWithItems { order, items })
    }
}
