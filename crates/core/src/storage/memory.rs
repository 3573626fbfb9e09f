//! Process-local [`Storage`] adapter.
//!
//! Each entity kind is an insertion-ordered `Vec` with its own id counter.
//! Counters start at 1 and only move forward, so ids are never reused even
//! after deletes. Reads hand out clones; writes replace rows in place. A
//! caller can never observe a later mutation through a value it already
//! holds.
//!
//! The adapter enforces the same constraints as the database schema: unique
//! email, one cart per user, one line per product per cart, and existing
//! parents for every child row.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{MergedCartItem, Pagination, Storage, StorageError, StorageResult};
use crate::models::{
    Cart, CartItem, NewCart, NewCartItem, NewOrder, NewOrderItem, NewProduct, NewUser, Order,
    OrderItem, OrderLine, OrderWithItems, Product, ProductUpdate, User, UserUpdate,
};
use crate::types::{
    CartId, CartItemId, Email, OrderId, OrderItemId, OrderStatus, ProductId, UserId,
};

/// In-memory storage for tests and database-less development.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: Mutex<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    products: Vec<Product>,
    carts: Vec<Cart>,
    cart_items: Vec<CartItem>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
    ids: IdCounters,
}

#[derive(Debug)]
struct IdCounters {
    user: i32,
    product: i32,
    cart: i32,
    cart_item: i32,
    order: i32,
    order_item: i32,
}

impl Default for IdCounters {
    fn default() -> Self {
        Self {
            user: 1,
            product: 1,
            cart: 1,
            cart_item: 1,
            order: 1,
            order_item: 1,
        }
    }
}

/// Hand out the current value and advance the counter.
fn next_id(counter: &mut i32) -> StorageResult<i32> {
    let id = *counter;
    *counter = id
        .checked_add(1)
        .ok_or_else(|| StorageError::Unavailable("id space exhausted".to_owned()))?;
    Ok(id)
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> StorageResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StorageError::Unavailable("memory storage lock poisoned".to_owned()))
    }
}

impl Tables {
    fn require_user(&self, id: UserId) -> StorageResult<()> {
        if self.users.iter().any(|u| u.id == id) {
            Ok(())
        } else {
            Err(StorageError::InvalidReference(format!("user {id} does not exist")))
        }
    }

    fn require_cart(&self, id: CartId) -> StorageResult<()> {
        if self.carts.iter().any(|c| c.id == id) {
            Ok(())
        } else {
            Err(StorageError::InvalidReference(format!("cart {id} does not exist")))
        }
    }

    fn require_product(&self, id: ProductId) -> StorageResult<()> {
        if self.products.iter().any(|p| p.id == id) {
            Ok(())
        } else {
            Err(StorageError::InvalidReference(format!(
                "product {id} does not exist"
            )))
        }
    }

    fn require_order(&self, id: OrderId) -> StorageResult<()> {
        if self.orders.iter().any(|o| o.id == id) {
            Ok(())
        } else {
            Err(StorageError::InvalidReference(format!("order {id} does not exist")))
        }
    }

    fn insert_cart(&mut self, user_id: UserId) -> StorageResult<Cart> {
        self.require_user(user_id)?;
        if self.carts.iter().any(|c| c.user_id == user_id) {
            return Err(StorageError::Conflict(format!(
                "user {user_id} already has a cart"
            )));
        }

        let now = Utc::now();
        let cart = Cart {
            id: CartId::new(next_id(&mut self.ids.cart)?),
            user_id,
            created_at: now,
            updated_at: now,
        };
        self.carts.push(cart.clone());
        Ok(cart)
    }

    fn insert_cart_item(&mut self, item: NewCartItem) -> StorageResult<CartItem> {
        self.require_cart(item.cart_id)?;
        self.require_product(item.product_id)?;
        if self
            .cart_items
            .iter()
            .any(|i| i.cart_id == item.cart_id && i.product_id == item.product_id)
        {
            return Err(StorageError::Conflict(format!(
                "product {} is already in cart {}",
                item.product_id, item.cart_id
            )));
        }

        let now = Utc::now();
        let row = CartItem {
            id: CartItemId::new(next_id(&mut self.ids.cart_item)?),
            cart_id: item.cart_id,
            product_id: item.product_id,
            quantity: item.quantity,
            created_at: now,
            updated_at: now,
        };
        self.cart_items.push(row.clone());
        Ok(row)
    }

    fn insert_order(&mut self, order: NewOrder) -> StorageResult<Order> {
        self.require_user(order.user_id)?;

        let now = Utc::now();
        let status = order.status();
        let row = Order {
            id: OrderId::new(next_id(&mut self.ids.order)?),
            user_id: order.user_id,
            total: order.total,
            shipping_address: order.shipping_address,
            billing_address: order.billing_address,
            payment_method: order.payment_method,
            status,
            is_paid: order.is_paid,
            paid_at: order.is_paid.then_some(now),
            created_at: now,
            updated_at: now,
        };
        self.orders.push(row.clone());
        Ok(row)
    }

    fn insert_order_item(&mut self, item: NewOrderItem) -> StorageResult<OrderItem> {
        self.require_order(item.order_id)?;

        let row = OrderItem {
            id: OrderItemId::new(next_id(&mut self.ids.order_item)?),
            order_id: item.order_id,
            product_id: item.product_id,
            name: item.name,
            price: item.price,
            quantity: item.quantity,
            created_at: Utc::now(),
        };
        self.order_items.push(row.clone());
        Ok(row)
    }

    /// Drop cart lines whose cart or product no longer exists.
    fn drop_orphaned_cart_items(&mut self) {
        let carts = &self.carts;
        let products = &self.products;
        self.cart_items.retain(|item| {
            carts.iter().any(|c| c.id == item.cart_id)
                && products.iter().any(|p| p.id == item.product_id)
        });
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    // =========================================================================
    // Users
    // =========================================================================

    async fn list_users(&self, page: Pagination) -> StorageResult<Vec<User>> {
        Ok(page.window(&self.tables()?.users))
    }

    async fn get_user(&self, id: UserId) -> StorageResult<Option<User>> {
        Ok(self.tables()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_email(&self, email: &Email) -> StorageResult<Option<User>> {
        Ok(self
            .tables()?
            .users
            .iter()
            .find(|u| &u.email == email)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> StorageResult<User> {
        let mut tables = self.tables()?;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(StorageError::Conflict("email already exists".to_owned()));
        }

        let role = user.role();
        let row = User {
            id: UserId::new(next_id(&mut tables.ids.user)?),
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            role,
            created_at: Utc::now(),
        };
        tables.users.push(row.clone());
        tracing::debug!(user_id = %row.id, "user created");
        Ok(row)
    }

    async fn update_user(&self, id: UserId, update: UserUpdate) -> StorageResult<Option<User>> {
        let mut tables = self.tables()?;
        if let Some(email) = &update.email
            && tables.users.iter().any(|u| &u.email == email && u.id != id)
        {
            return Err(StorageError::Conflict("email already exists".to_owned()));
        }

        let Some(row) = tables.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        let mut updated = row.clone();
        update.apply_to(&mut updated);
        *row = updated.clone();
        Ok(Some(updated))
    }

    async fn delete_user(&self, id: UserId) -> StorageResult<bool> {
        let mut tables = self.tables()?;
        if !tables.users.iter().any(|u| u.id == id) {
            return Ok(false);
        }
        if tables.orders.iter().any(|o| o.user_id == id) {
            return Err(StorageError::InvalidReference(format!(
                "user {id} has orders"
            )));
        }

        tables.users.retain(|u| u.id != id);
        tables.carts.retain(|c| c.user_id != id);
        tables.drop_orphaned_cart_items();
        Ok(true)
    }

    // =========================================================================
    // Products
    // =========================================================================

    async fn list_products(&self, page: Pagination) -> StorageResult<Vec<Product>> {
        Ok(page.window(&self.tables()?.products))
    }

    async fn get_product(&self, id: ProductId) -> StorageResult<Option<Product>> {
        Ok(self.tables()?.products.iter().find(|p| p.id == id).cloned())
    }

    async fn create_product(&self, product: NewProduct) -> StorageResult<Product> {
        let mut tables = self.tables()?;
        let now = Utc::now();
        let row = Product {
            id: ProductId::new(next_id(&mut tables.ids.product)?),
            name: product.name,
            description: product.description,
            price: product.price,
            image_url: product.image_url,
            stock: product.stock,
            created_at: now,
            updated_at: now,
        };
        tables.products.push(row.clone());
        Ok(row)
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> StorageResult<Option<Product>> {
        let mut tables = self.tables()?;
        let Some(row) = tables.products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        let mut updated = row.clone();
        update.apply_to(&mut updated);
        updated.updated_at = Utc::now();
        *row = updated.clone();
        Ok(Some(updated))
    }

    async fn delete_product(&self, id: ProductId) -> StorageResult<bool> {
        let mut tables = self.tables()?;
        let before = tables.products.len();
        tables.products.retain(|p| p.id != id);
        let removed = tables.products.len() != before;
        if removed {
            tables.drop_orphaned_cart_items();
        }
        Ok(removed)
    }

    // =========================================================================
    // Carts
    // =========================================================================

    async fn get_cart(&self, user_id: UserId) -> StorageResult<Option<Cart>> {
        Ok(self
            .tables()?
            .carts
            .iter()
            .find(|c| c.user_id == user_id)
            .cloned())
    }

    async fn create_cart(&self, cart: NewCart) -> StorageResult<Cart> {
        self.tables()?.insert_cart(cart.user_id)
    }

    // =========================================================================
    // Cart items
    // =========================================================================

    async fn list_cart_items(&self, cart_id: CartId) -> StorageResult<Vec<CartItem>> {
        Ok(self
            .tables()?
            .cart_items
            .iter()
            .filter(|i| i.cart_id == cart_id)
            .cloned()
            .collect())
    }

    async fn get_cart_item(&self, id: CartItemId) -> StorageResult<Option<CartItem>> {
        Ok(self
            .tables()?
            .cart_items
            .iter()
            .find(|i| i.id == id)
            .cloned())
    }

    async fn add_cart_item(&self, item: NewCartItem) -> StorageResult<CartItem> {
        self.tables()?.insert_cart_item(item)
    }

    async fn update_cart_item(
        &self,
        id: CartItemId,
        quantity: i32,
    ) -> StorageResult<Option<CartItem>> {
        let mut tables = self.tables()?;
        let Some(row) = tables.cart_items.iter_mut().find(|i| i.id == id) else {
            return Ok(None);
        };
        let updated = CartItem {
            quantity,
            updated_at: Utc::now(),
            ..row.clone()
        };
        *row = updated.clone();
        Ok(Some(updated))
    }

    async fn remove_cart_item(&self, id: CartItemId) -> StorageResult<bool> {
        let mut tables = self.tables()?;
        let before = tables.cart_items.len();
        tables.cart_items.retain(|i| i.id != id);
        Ok(tables.cart_items.len() != before)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    async fn list_orders(
        &self,
        user_id: Option<UserId>,
        page: Pagination,
    ) -> StorageResult<Vec<Order>> {
        let tables = self.tables()?;
        Ok(page.window(
            tables
                .orders
                .iter()
                .filter(|o| user_id.is_none_or(|uid| o.user_id == uid)),
        ))
    }

    async fn get_order(&self, id: OrderId) -> StorageResult<Option<Order>> {
        Ok(self.tables()?.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn create_order(&self, order: NewOrder) -> StorageResult<Order> {
        self.tables()?.insert_order(order)
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> StorageResult<Option<Order>> {
        let mut tables = self.tables()?;
        let Some(row) = tables.orders.iter_mut().find(|o| o.id == id) else {
            return Ok(None);
        };
        let updated = Order {
            status,
            updated_at: Utc::now(),
            ..row.clone()
        };
        *row = updated.clone();
        Ok(Some(updated))
    }

    // =========================================================================
    // Order items
    // =========================================================================

    async fn list_order_items(&self, order_id: OrderId) -> StorageResult<Vec<OrderItem>> {
        Ok(self
            .tables()?
            .order_items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn create_order_item(&self, item: NewOrderItem) -> StorageResult<OrderItem> {
        self.tables()?.insert_order_item(item)
    }

    // =========================================================================
    // Compound operations (single lock acquisition each)
    // =========================================================================

    async fn get_or_create_cart(&self, user_id: UserId) -> StorageResult<Cart> {
        let mut tables = self.tables()?;
        if let Some(cart) = tables.carts.iter().find(|c| c.user_id == user_id) {
            return Ok(cart.clone());
        }
        tables.insert_cart(user_id)
    }

    async fn merge_cart_item(&self, item: NewCartItem) -> StorageResult<MergedCartItem> {
        let mut tables = self.tables()?;
        if let Some(row) = tables
            .cart_items
            .iter_mut()
            .find(|i| i.cart_id == item.cart_id && i.product_id == item.product_id)
        {
            let updated = CartItem {
                quantity: row.quantity.saturating_add(item.quantity),
                updated_at: Utc::now(),
                ..row.clone()
            };
            *row = updated.clone();
            return Ok(MergedCartItem {
                item: updated,
                created: false,
            });
        }

        let created = tables.insert_cart_item(item)?;
        Ok(MergedCartItem {
            item: created,
            created: true,
        })
    }

    async fn create_order_with_items(
        &self,
        order: NewOrder,
        lines: Vec<OrderLine>,
    ) -> StorageResult<OrderWithItems> {
        let mut tables = self.tables()?;
        // Every check that can fail happens before the first insert.
        tables.require_user(order.user_id)?;

        let order = tables.insert_order(order)?;
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            items.push(tables.insert_order_item(line.into_new_item(order.id))?);
        }
        Ok(OrderWithItems { order, items })
    }
}
