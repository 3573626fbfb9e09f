//! `Storage` implementation for [`PgStorage`].

use async_trait::async_trait;

use bramble_core::models::{
    Cart, CartItem, NewCart, NewCartItem, NewOrder, NewOrderItem, NewProduct, NewUser, Order,
    OrderItem, OrderLine, OrderWithItems, Product, ProductUpdate, User, UserUpdate,
};
use bramble_core::storage::MergedCartItem;
use bramble_core::{
    CartId, CartItemId, Email, OrderId, OrderStatus, Pagination, ProductId, Storage,
    StorageResult, UserId,
};

use super::rows::{
    CartItemRow, CartRow, MergedCartItemRow, OrderItemRow, OrderRow, ProductRow, UserRow,
};
use super::{PgStorage, map_sqlx_error};

fn limit_offset(page: Pagination) -> (i64, i64) {
    (i64::from(page.limit), i64::from(page.offset))
}

#[async_trait]
impl Storage for PgStorage {
    // =========================================================================
    // Users
    // =========================================================================

    async fn list_users(&self, page: Pagination) -> StorageResult<Vec<User>> {
        let (limit, offset) = limit_offset(page);
        let rows = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, email, password_hash, first_name, last_name, role, created_at
            FROM users
            ORDER BY id
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn get_user(&self, id: UserId) -> StorageResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, email, password_hash, first_name, last_name, role, created_at
            FROM users
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_user_by_email(&self, email: &Email) -> StorageResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, email, password_hash, first_name, last_name, role, created_at
            FROM users
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(TryInto::try_into).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn create_user(&self, user: NewUser) -> StorageResult<User> {
        let role = user.role();
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO users (email, password_hash, first_name, last_name, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, password_hash, first_name, last_name, role, created_at
            ",
        )
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.try_into()
    }

    #[tracing::instrument(skip(self))]
    async fn update_user(&self, id: UserId, update: UserUpdate) -> StorageResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            UPDATE users SET
                email = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash),
                first_name = COALESCE($4, first_name),
                last_name = COALESCE($5, last_name),
                role = COALESCE($6, role)
            WHERE id = $1
            RETURNING id, email, password_hash, first_name, last_name, role, created_at
            ",
        )
        .bind(id)
        .bind(update.email.as_ref().map(Email::as_str))
        .bind(update.password_hash.as_deref())
        .bind(update.first_name.as_deref())
        .bind(update.last_name.as_deref())
        .bind(update.role)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(TryInto::try_into).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn delete_user(&self, id: UserId) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Products
    // =========================================================================

    async fn list_products(&self, page: Pagination) -> StorageResult<Vec<Product>> {
        let (limit, offset) = limit_offset(page);
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, description, price, image_url, stock, created_at, updated_at
            FROM products
            ORDER BY id
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_product(&self, id: ProductId) -> StorageResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, description, price, image_url, stock, created_at, updated_at
            FROM products
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    #[tracing::instrument(skip(self))]
    async fn create_product(&self, product: NewProduct) -> StorageResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO products (name, description, price, image_url, stock)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, description, price, image_url, stock, created_at, updated_at
            ",
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.image_url.as_deref())
        .bind(product.stock)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    #[tracing::instrument(skip(self))]
    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> StorageResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            UPDATE products SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                image_url = COALESCE($5, image_url),
                stock = COALESCE($6, stock),
                updated_at = now()
            WHERE id = $1
            RETURNING id, name, description, price, image_url, stock, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(update.name.as_deref())
        .bind(update.description.as_deref())
        .bind(update.price)
        .bind(update.image_url.as_deref())
        .bind(update.stock)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    #[tracing::instrument(skip(self))]
    async fn delete_product(&self, id: ProductId) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Carts
    // =========================================================================

    async fn get_cart(&self, user_id: UserId) -> StorageResult<Option<Cart>> {
        let row = sqlx::query_as::<_, CartRow>(
            "SELECT id, user_id, created_at, updated_at FROM carts WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn create_cart(&self, cart: NewCart) -> StorageResult<Cart> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            INSERT INTO carts (user_id)
            VALUES ($1)
            RETURNING id, user_id, created_at, updated_at
            ",
        )
        .bind(cart.user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    // =========================================================================
    // Cart items
    // =========================================================================

    async fn list_cart_items(&self, cart_id: CartId) -> StorageResult<Vec<CartItem>> {
        let rows = sqlx::query_as::<_, CartItemRow>(
            r"
            SELECT id, cart_id, product_id, quantity, created_at, updated_at
            FROM cart_items
            WHERE cart_id = $1
            ORDER BY id
            ",
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_cart_item(&self, id: CartItemId) -> StorageResult<Option<CartItem>> {
        let row = sqlx::query_as::<_, CartItemRow>(
            r"
            SELECT id, cart_id, product_id, quantity, created_at, updated_at
            FROM cart_items
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn add_cart_item(&self, item: NewCartItem) -> StorageResult<CartItem> {
        let row = sqlx::query_as::<_, CartItemRow>(
            r"
            INSERT INTO cart_items (cart_id, product_id, quantity)
            VALUES ($1, $2, $3)
            RETURNING id, cart_id, product_id, quantity, created_at, updated_at
            ",
        )
        .bind(item.cart_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_cart_item(
        &self,
        id: CartItemId,
        quantity: i32,
    ) -> StorageResult<Option<CartItem>> {
        let row = sqlx::query_as::<_, CartItemRow>(
            r"
            UPDATE cart_items SET quantity = $2, updated_at = now()
            WHERE id = $1
            RETURNING id, cart_id, product_id, quantity, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn remove_cart_item(&self, id: CartItemId) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    async fn list_orders(
        &self,
        user_id: Option<UserId>,
        page: Pagination,
    ) -> StorageResult<Vec<Order>> {
        let (limit, offset) = limit_offset(page);
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, total, shipping_address, billing_address, payment_method,
                   status, is_paid, paid_at, created_at, updated_at
            FROM orders
            WHERE $1::integer IS NULL OR user_id = $1
            ORDER BY id
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_order(&self, id: OrderId) -> StorageResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, total, shipping_address, billing_address, payment_method,
                   status, is_paid, paid_at, created_at, updated_at
            FROM orders
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    #[tracing::instrument(skip(self))]
    async fn create_order(&self, order: NewOrder) -> StorageResult<Order> {
        let row = insert_order(&self.pool, &order).await?;
        Ok(row.into())
    }

    #[tracing::instrument(skip(self))]
    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> StorageResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            UPDATE orders SET status = $2, updated_at = now()
            WHERE id = $1
            RETURNING id, user_id, total, shipping_address, billing_address, payment_method,
                      status, is_paid, paid_at, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    // =========================================================================
    // Order items
    // =========================================================================

    async fn list_order_items(&self, order_id: OrderId) -> StorageResult<Vec<OrderItem>> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT id, order_id, product_id, name, price, quantity, created_at
            FROM order_items
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_order_item(&self, item: NewOrderItem) -> StorageResult<OrderItem> {
        let row = insert_order_item(&self.pool, &item).await?;
        Ok(row.into())
    }

    async fn ping(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    // =========================================================================
    // Compound operations
    // =========================================================================

    #[tracing::instrument(skip(self))]
    async fn get_or_create_cart(&self, user_id: UserId) -> StorageResult<Cart> {
        let inserted = sqlx::query_as::<_, CartRow>(
            r"
            INSERT INTO carts (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING id, user_id, created_at, updated_at
            ",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if let Some(row) = inserted {
            let cart = Cart::from(row);
            tracing::debug!(cart_id = %cart.id, "cart created");
            return Ok(cart);
        }

        // A separate statement sees the row committed by whoever won.
        let row = sqlx::query_as::<_, CartRow>(
            "SELECT id, user_id, created_at, updated_at FROM carts WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    #[tracing::instrument(skip(self))]
    async fn merge_cart_item(&self, item: NewCartItem) -> StorageResult<MergedCartItem> {
        let row = sqlx::query_as::<_, MergedCartItemRow>(
            r"
            INSERT INTO cart_items (cart_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, product_id) DO UPDATE SET
                quantity = cart_items.quantity + EXCLUDED.quantity,
                updated_at = now()
            RETURNING id, cart_id, product_id, quantity, created_at, updated_at,
                      (xmax = 0) AS inserted
            ",
        )
        .bind(item.cart_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(MergedCartItem {
            item: row.item.into(),
            created: row.inserted,
        })
    }

    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    async fn create_order_with_items(
        &self,
        order: NewOrder,
        lines: Vec<OrderLine>,
    ) -> StorageResult<OrderWithItems> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let order: Order = insert_order(&mut *tx, &order).await?.into();
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let item = line.into_new_item(order.id);
            items.push(insert_order_item(&mut *tx, &item).await?.into());
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(OrderWithItems { order, items })
    }
}

async fn insert_order<'e, E>(executor: E, order: &NewOrder) -> StorageResult<OrderRow>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, OrderRow>(
        r"
        INSERT INTO orders (
            user_id, total, shipping_address, billing_address, payment_method,
            status, is_paid, paid_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, CASE WHEN $7 THEN now() END)
        RETURNING id, user_id, total, shipping_address, billing_address, payment_method,
                  status, is_paid, paid_at, created_at, updated_at
        ",
    )
    .bind(order.user_id)
    .bind(order.total)
    .bind(&order.shipping_address)
    .bind(&order.billing_address)
    .bind(&order.payment_method)
    .bind(order.status())
    .bind(order.is_paid)
    .fetch_one(executor)
    .await
    .map_err(map_sqlx_error)
}

async fn insert_order_item<'e, E>(executor: E, item: &NewOrderItem) -> StorageResult<OrderItemRow>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, OrderItemRow>(
        r"
        INSERT INTO order_items (order_id, product_id, name, price, quantity)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, order_id, product_id, name, price, quantity, created_at
        ",
    )
    .bind(item.order_id)
    .bind(item.product_id)
    .bind(&item.name)
    .bind(item.price)
    .bind(item.quantity)
    .fetch_one(executor)
    .await
    .map_err(map_sqlx_error)
}
