//! Storage port contract.
//!
//! Every check runs against `MemoryStorage`, and against `PgStorage` when
//! `BRAMBLE_TEST_DATABASE_URL` points at a scratch database. Checks only
//! look at rows they created themselves so a shared database is fine.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use bramble_core::models::{
    NewCart, NewCartItem, NewOrder, NewUser, OrderLine, ProductUpdate, UserUpdate,
};
use bramble_core::{
    Email, OrderStatus, Pagination, ProductId, Role, Storage, StorageError, UserId,
};
use bramble_integration_tests::{sample_product, unique_email};
use rust_decimal::Decimal;

/// Generate a memory test and a Postgres test for each check.
macro_rules! contract_tests {
    ($($check:ident),* $(,)?) => {
        mod memory {
            $(
                #[tokio::test]
                async fn $check() {
                    super::$check(&bramble_core::MemoryStorage::new()).await;
                }
            )*
        }

        mod postgres {
            $(
                #[tokio::test]
                async fn $check() {
                    let Some(storage) = bramble_integration_tests::pg_storage().await else {
                        return;
                    };
                    super::$check(&storage).await;
                }
            )*
        }
    };
}

contract_tests!(
    lookups_of_missing_rows_are_none,
    duplicate_email_is_conflict,
    update_user_changes_only_given_fields,
    product_update_bumps_updated_at,
    list_window_is_offset_then_limit,
    one_cart_per_user,
    cart_item_needs_cart_and_product,
    merge_increments_existing_line,
    remove_cart_item_reports_presence,
    paid_at_follows_is_paid,
    list_orders_filters_by_user,
    order_with_items_is_created_together,
    deleting_user_with_orders_is_refused,
    deleting_product_drops_its_cart_lines,
    money_round_trips_exactly,
);

// =============================================================================
// Fixtures
// =============================================================================

async fn user(storage: &dyn Storage) -> UserId {
    storage
        .create_user(NewUser {
            email: Email::parse(&unique_email("contract")).unwrap(),
            password_hash: "$argon2id$fixture".to_string(),
            first_name: "Contract".to_string(),
            last_name: "Tester".to_string(),
            role: None,
        })
        .await
        .unwrap()
        .id
}

async fn product(storage: &dyn Storage, price: &str) -> ProductId {
    storage
        .create_product(sample_product("Contract Soap", price))
        .await
        .unwrap()
        .id
}

fn new_order(user_id: UserId, is_paid: bool) -> NewOrder {
    NewOrder {
        user_id,
        total: Decimal::new(1300, 2),
        shipping_address: "1 Hedge Lane".to_string(),
        billing_address: "1 Hedge Lane".to_string(),
        payment_method: "card".to_string(),
        status: None,
        is_paid,
    }
}

// =============================================================================
// Checks
// =============================================================================

async fn lookups_of_missing_rows_are_none(storage: &dyn Storage) {
    let missing = i32::MAX;
    assert!(storage.get_user(missing.into()).await.unwrap().is_none());
    assert!(storage.get_product(missing.into()).await.unwrap().is_none());
    assert!(storage.get_cart(missing.into()).await.unwrap().is_none());
    assert!(storage.get_cart_item(missing.into()).await.unwrap().is_none());
    assert!(storage.get_order(missing.into()).await.unwrap().is_none());
    assert!(!storage.delete_product(missing.into()).await.unwrap());
    assert!(
        storage
            .update_order_status(missing.into(), OrderStatus::Shipped)
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        storage
            .update_product(missing.into(), ProductUpdate::default())
            .await
            .unwrap()
            .is_none()
    );
}

async fn duplicate_email_is_conflict(storage: &dyn Storage) {
    let email = Email::parse(&unique_email("dup")).unwrap();
    let new_user = NewUser {
        email: email.clone(),
        password_hash: "$argon2id$fixture".to_string(),
        first_name: "First".to_string(),
        last_name: "Copy".to_string(),
        role: Some(Role::Admin),
    };

    let created = storage.create_user(new_user.clone()).await.unwrap();
    assert_eq!(created.role, Role::Admin);

    let err = storage.create_user(new_user).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)), "got {err:?}");

    let found = storage.get_user_by_email(&email).await.unwrap().unwrap();
    assert_eq!(found.id, created.id);
}

async fn update_user_changes_only_given_fields(storage: &dyn Storage) {
    let id = user(storage).await;
    let before = storage.get_user(id).await.unwrap().unwrap();

    let after = storage
        .update_user(
            id,
            UserUpdate {
                first_name: Some("Renamed".to_string()),
                ..UserUpdate::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(after.first_name, "Renamed");
    assert_eq!(after.last_name, before.last_name);
    assert_eq!(after.email, before.email);
    assert_eq!(after.created_at, before.created_at);
}

async fn product_update_bumps_updated_at(storage: &dyn Storage) {
    let id = product(storage, "4.00").await;
    let before = storage.get_product(id).await.unwrap().unwrap();

    let after = storage
        .update_product(
            id,
            ProductUpdate {
                price: Some(Decimal::new(450, 2)),
                ..ProductUpdate::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(after.price, Decimal::new(450, 2));
    assert_eq!(after.name, before.name);
    assert!(after.updated_at >= before.updated_at);
    assert_eq!(after.created_at, before.created_at);
}

async fn list_window_is_offset_then_limit(storage: &dyn Storage) {
    let owner = user(storage).await;
    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(storage.create_order(new_order(owner, false)).await.unwrap().id);
    }

    let all = storage
        .list_orders(Some(owner), Pagination::new(10, 0))
        .await
        .unwrap();
    assert_eq!(all.iter().map(|o| o.id).collect::<Vec<_>>(), ids);

    let middle = storage
        .list_orders(Some(owner), Pagination::new(1, 1))
        .await
        .unwrap();
    assert_eq!(middle.len(), 1);
    assert_eq!(middle[0].id, ids[1]);

    let past_end = storage
        .list_orders(Some(owner), Pagination::new(10, 5))
        .await
        .unwrap();
    assert!(past_end.is_empty());
}

async fn one_cart_per_user(storage: &dyn Storage) {
    let owner = user(storage).await;

    let first = storage.get_or_create_cart(owner).await.unwrap();
    let second = storage.get_or_create_cart(owner).await.unwrap();
    assert_eq!(first.id, second.id);

    let err = storage
        .create_cart(NewCart { user_id: owner })
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)), "got {err:?}");
}

async fn cart_item_needs_cart_and_product(storage: &dyn Storage) {
    let owner = user(storage).await;
    let cart = storage.get_or_create_cart(owner).await.unwrap();

    let err = storage
        .add_cart_item(NewCartItem {
            cart_id: cart.id,
            product_id: i32::MAX.into(),
            quantity: 1,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidReference(_)), "got {err:?}");

    let err = storage
        .create_cart(NewCart {
            user_id: i32::MAX.into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidReference(_)), "got {err:?}");
}

async fn merge_increments_existing_line(storage: &dyn Storage) {
    let owner = user(storage).await;
    let soap = product(storage, "3.25").await;
    let cart = storage.get_or_create_cart(owner).await.unwrap();
    let line = NewCartItem {
        cart_id: cart.id,
        product_id: soap,
        quantity: 2,
    };

    let first = storage.merge_cart_item(line).await.unwrap();
    assert!(first.created);
    assert_eq!(first.item.quantity, 2);

    let second = storage
        .merge_cart_item(NewCartItem { quantity: 3, ..line })
        .await
        .unwrap();
    assert!(!second.created);
    assert_eq!(second.item.id, first.item.id);
    assert_eq!(second.item.quantity, 5);

    let items = storage.list_cart_items(cart.id).await.unwrap();
    assert_eq!(items.len(), 1);

    let err = storage.add_cart_item(line).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)), "got {err:?}");
}

async fn remove_cart_item_reports_presence(storage: &dyn Storage) {
    let owner = user(storage).await;
    let soap = product(storage, "3.25").await;
    let cart = storage.get_or_create_cart(owner).await.unwrap();
    let item = storage
        .add_cart_item(NewCartItem {
            cart_id: cart.id,
            product_id: soap,
            quantity: 1,
        })
        .await
        .unwrap();

    let updated = storage.update_cart_item(item.id, 4).await.unwrap().unwrap();
    assert_eq!(updated.quantity, 4);

    assert!(storage.remove_cart_item(item.id).await.unwrap());
    assert!(!storage.remove_cart_item(item.id).await.unwrap());
    assert!(storage.update_cart_item(item.id, 2).await.unwrap().is_none());
}

async fn paid_at_follows_is_paid(storage: &dyn Storage) {
    let owner = user(storage).await;

    let unpaid = storage.create_order(new_order(owner, false)).await.unwrap();
    assert!(!unpaid.is_paid);
    assert!(unpaid.paid_at.is_none());
    assert_eq!(unpaid.status, OrderStatus::Pending);

    let paid = storage.create_order(new_order(owner, true)).await.unwrap();
    assert!(paid.is_paid);
    assert!(paid.paid_at.is_some());

    let shipped = storage
        .update_order_status(unpaid.id, OrderStatus::Shipped)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);
    assert!(shipped.paid_at.is_none());
}

async fn list_orders_filters_by_user(storage: &dyn Storage) {
    let alice = user(storage).await;
    let bob = user(storage).await;
    let a = storage.create_order(new_order(alice, false)).await.unwrap();
    let b = storage.create_order(new_order(bob, false)).await.unwrap();

    let mine = storage
        .list_orders(Some(alice), Pagination::default())
        .await
        .unwrap();
    assert_eq!(mine.iter().map(|o| o.id).collect::<Vec<_>>(), vec![a.id]);

    let everyone = storage
        .list_orders(None, Pagination::new(u32::MAX, 0))
        .await
        .unwrap();
    assert!(everyone.iter().any(|o| o.id == a.id));
    assert!(everyone.iter().any(|o| o.id == b.id));
}

async fn order_with_items_is_created_together(storage: &dyn Storage) {
    let owner = user(storage).await;
    let soap = product(storage, "6.50").await;
    let lines = vec![OrderLine {
        product_id: soap,
        name: "Contract Soap".to_string(),
        price: Decimal::new(650, 2),
        quantity: 2,
    }];

    let placed = storage
        .create_order_with_items(new_order(owner, true), lines)
        .await
        .unwrap();
    assert_eq!(placed.items.len(), 1);
    assert_eq!(placed.items[0].order_id, placed.order.id);

    let stored = storage.list_order_items(placed.order.id).await.unwrap();
    assert_eq!(stored, placed.items);

    // A failing order write leaves no order behind for the user.
    let stranger = i32::MAX.into();
    let err = storage
        .create_order_with_items(new_order(stranger, false), Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidReference(_)), "got {err:?}");
    assert!(
        storage
            .list_orders(Some(stranger), Pagination::default())
            .await
            .unwrap()
            .is_empty()
    );
}

async fn deleting_user_with_orders_is_refused(storage: &dyn Storage) {
    let shopper = user(storage).await;
    storage.create_order(new_order(shopper, false)).await.unwrap();

    let err = storage.delete_user(shopper).await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidReference(_)), "got {err:?}");
    assert!(storage.get_user(shopper).await.unwrap().is_some());

    let browser = user(storage).await;
    let cart = storage.get_or_create_cart(browser).await.unwrap();
    assert!(storage.delete_user(browser).await.unwrap());
    assert!(storage.get_cart(browser).await.unwrap().is_none());
    assert!(storage.list_cart_items(cart.id).await.unwrap().is_empty());
}

async fn deleting_product_drops_its_cart_lines(storage: &dyn Storage) {
    let owner = user(storage).await;
    let soap = product(storage, "2.00").await;
    let cart = storage.get_or_create_cart(owner).await.unwrap();
    let item = storage
        .add_cart_item(NewCartItem {
            cart_id: cart.id,
            product_id: soap,
            quantity: 1,
        })
        .await
        .unwrap();

    assert!(storage.delete_product(soap).await.unwrap());
    assert!(storage.get_cart_item(item.id).await.unwrap().is_none());
}

async fn money_round_trips_exactly(storage: &dyn Storage) {
    let owner = user(storage).await;

    for price in ["0.01", "6.50", "99999999.99"] {
        let id = product(storage, price).await;
        let stored = storage.get_product(id).await.unwrap().unwrap();
        assert_eq!(stored.price.to_string(), price);
    }

    let order = storage
        .create_order_with_items(
            NewOrder {
                total: "13.00".parse().unwrap(),
                ..new_order(owner, false)
            },
            vec![OrderLine {
                product_id: i32::MAX.into(),
                name: "Contract Soap".to_string(),
                price: "6.50".parse().unwrap(),
                quantity: 2,
            }],
        )
        .await
        .unwrap();
    let stored = storage.get_order(order.order.id).await.unwrap().unwrap();
    assert_eq!(stored.total.to_string(), "13.00");
    let items = storage.list_order_items(order.order.id).await.unwrap();
    assert_eq!(items[0].price.to_string(), "6.50");
}
