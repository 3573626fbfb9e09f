//! HTTP API tests against the in-process router.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use bramble_core::Role;
use bramble_core::models::ProductUpdate;
use bramble_integration_tests::{TEST_PASSWORD, TestApp, unique_email};
use rust_decimal::Decimal;
use serde_json::{Value, json};

fn decimal(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

fn checkout_body() -> Value {
    json!({
        "shippingAddress": "12 Bramble Row",
        "paymentMethod": "card",
        "isPaid": true,
    })
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn test_register_login_logout_cycle() {
    let app = TestApp::new();
    let mut client = app.client();
    let email = unique_email("shopper");

    let res = client
        .post(
            "/api/auth/register",
            json!({
                "email": email,
                "password": TEST_PASSWORD,
                "firstName": "Sam",
                "lastName": "Shopper",
                "role": "admin",
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["email"], email);
    assert_eq!(res.body["role"], "customer");
    assert!(res.body.get("passwordHash").is_none());

    let res = client.get("/api/auth/me").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["firstName"], "Sam");

    let res = client.post("/api/auth/logout", json!({})).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "Logged out");

    let res = client.get("/api/auth/me").await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = client
        .post(
            "/api/auth/login",
            json!({ "email": email, "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(client.get("/api/auth/me").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_bad_input() {
    let app = TestApp::new();
    let mut client = app.client();
    let email = unique_email("dup");
    let body = json!({
        "email": email,
        "password": TEST_PASSWORD,
        "firstName": "Dana",
        "lastName": "Double",
    });

    assert_eq!(
        client.post("/api/auth/register", body.clone()).await.status,
        StatusCode::CREATED
    );
    let res = app.client().post("/api/auth/register", body).await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = app
        .client()
        .post(
            "/api/auth/register",
            json!({
                "email": "not-an-email",
                "password": TEST_PASSWORD,
                "firstName": "Bad",
                "lastName": "Email",
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .client()
        .post(
            "/api/auth/register",
            json!({
                "email": unique_email("short"),
                "password": "short",
                "firstName": "Weak",
                "lastName": "Password",
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_with_wrong_password_is_unauthorized() {
    let app = TestApp::new();
    let (_, user) = app.login_as(Role::Customer).await;

    let res = app
        .client()
        .post(
            "/api/auth/login",
            json!({ "email": user["email"], "password": "wrong_password" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert!(res.body["message"].is_string());
}

#[tokio::test]
async fn test_deleted_account_ends_session() {
    let app = TestApp::new();
    let (mut client, user) = app.login_as(Role::Customer).await;
    let id = user["id"].as_i64().unwrap();

    let deleted = app
        .storage()
        .delete_user(i32::try_from(id).unwrap().into())
        .await
        .unwrap();
    assert!(deleted);

    assert_eq!(client.get("/api/auth/me").await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(client.get("/api/cart").await.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = TestApp::new();
    let res = app.client().post_raw("/api/auth/login", "{not json").await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["message"].is_string());
}

// ============================================================================
// Products
// ============================================================================

#[tokio::test]
async fn test_product_writes_require_admin() {
    let app = TestApp::new();
    let body = json!({
        "name": "Bramble Jam",
        "description": "Blackberry jam in a 250g jar.",
        "price": "6.50",
        "stock": 4,
    });

    let res = app.client().post("/api/products", body.clone()).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let (mut customer, _) = app.login_as(Role::Customer).await;
    let res = customer.post("/api/products", body.clone()).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let (mut admin, _) = app.login_as(Role::Admin).await;
    let res = admin.post("/api/products", body).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["name"], "Bramble Jam");
    assert_eq!(decimal(&res.body["price"]), Decimal::new(650, 2));
}

#[tokio::test]
async fn test_product_lifecycle() {
    let app = TestApp::new();
    let (mut admin, _) = app.login_as(Role::Admin).await;

    let res = admin
        .post(
            "/api/products",
            json!({
                "name": "Hedgerow Tea",
                "description": "Blackberry leaf and rosehip.",
                "price": "0",
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let tea = app.product("Hedgerow Tea", "8.99").await;
    let uri = format!("/api/products/{}", tea.id);

    let res = app.client().get(&uri).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["stock"], 10);

    let res = admin.put(&uri, json!({ "stock": 3 })).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["stock"], 3);
    assert_eq!(res.body["name"], "Hedgerow Tea");

    let res = admin.put(&uri, json!({ "name": "X" })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = admin.delete(&uri).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "Product deleted");

    assert_eq!(app.client().get(&uri).await.status, StatusCode::NOT_FOUND);
    assert_eq!(admin.delete(&uri).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_product_price_must_fit_money_rules() {
    let app = TestApp::new();
    let (mut admin, _) = app.login_as(Role::Admin).await;

    for (price, rule) in [
        ("6.505", "price must have at most 2 decimal places"),
        ("100000000", "price must be less than 100000000"),
    ] {
        let res = admin
            .post(
                "/api/products",
                json!({
                    "name": "Gold Hamper",
                    "description": "The most expensive thing we sell.",
                    "price": price,
                }),
            )
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "price {price}");
        assert_eq!(res.body["message"], "Validation error");
        assert_eq!(res.body["errors"][0]["field"], "price");
        assert_eq!(res.body["errors"][0]["message"], rule);
    }
}

#[tokio::test]
async fn test_order_total_past_money_limit_is_bad_request() {
    let app = TestApp::new();
    let hamper = app.product("Gold Hamper", "99999999.99").await;
    let (mut client, _) = app.login_as(Role::Customer).await;
    client
        .post("/api/cart/items", json!({ "productId": hamper.id, "quantity": 2 }))
        .await;

    let res = client.post("/api/orders", checkout_body()).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["errors"][0]["field"], "total");
    assert!(client.get("/api/orders").await.body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_product_list_pagination() {
    let app = TestApp::new();
    for name in ["First Soap", "Second Soap", "Third Soap"] {
        app.product(name, "3.00").await;
    }
    let mut client = app.client();

    let res = client.get("/api/products").await;
    assert_eq!(res.body.as_array().unwrap().len(), 3);

    let res = client.get("/api/products?limit=1&offset=1").await;
    let page = res.body.as_array().unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["name"], "Second Soap");

    let res = client.get("/api/products?offset=10").await;
    assert!(res.body.as_array().unwrap().is_empty());
}

// ============================================================================
// Cart
// ============================================================================

#[tokio::test]
async fn test_add_to_cart_merges_lines() {
    let app = TestApp::new();
    let soap = app.product("Lemon Soap", "4.00").await;
    let (mut client, _) = app.login_as(Role::Customer).await;

    let res = client.get("/api/cart").await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body["items"].as_array().unwrap().is_empty());

    let res = client
        .post("/api/cart/items", json!({ "productId": soap.id, "quantity": 2 }))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    let item_id = res.body["id"].clone();

    let res = client
        .post("/api/cart/items", json!({ "productId": soap.id, "quantity": 3 }))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["id"], item_id);
    assert_eq!(res.body["quantity"], 5);

    let res = client
        .post("/api/cart/items", json!({ "productId": soap.id }))
        .await;
    assert_eq!(res.body["quantity"], 6);

    let res = client.get("/api/cart").await;
    let items = res.body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 6);
}

#[tokio::test]
async fn test_cart_rejects_bad_items() {
    let app = TestApp::new();
    let soap = app.product("Lemon Soap", "4.00").await;
    let (mut client, _) = app.login_as(Role::Customer).await;

    let res = client
        .post("/api/cart/items", json!({ "productId": 9999, "quantity": 1 }))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = client
        .post("/api/cart/items", json!({ "productId": soap.id, "quantity": 0 }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = client.put("/api/cart/items/9999", json!({ "quantity": 2 })).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cart_items_are_private() {
    let app = TestApp::new();
    let soap = app.product("Lemon Soap", "4.00").await;
    let (mut owner, _) = app.login_as(Role::Customer).await;
    let (mut other, _) = app.login_as(Role::Customer).await;

    let res = owner
        .post("/api/cart/items", json!({ "productId": soap.id }))
        .await;
    let uri = format!("/api/cart/items/{}", res.body["id"]);

    assert_eq!(
        other.put(&uri, json!({ "quantity": 9 })).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(other.delete(&uri).await.status, StatusCode::NOT_FOUND);

    let res = owner.put(&uri, json!({ "quantity": 4 })).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["quantity"], 4);

    let res = owner.put(&uri, json!({ "quantity": 0 })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = owner.delete(&uri).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "Item removed from cart");
    assert_eq!(owner.delete(&uri).await.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Orders
// ============================================================================

#[tokio::test]
async fn test_checkout_snapshots_cart() {
    let app = TestApp::new();
    let jam = app.product("Bramble Jam", "6.50").await;
    let tea = app.product("Hedgerow Tea", "8.99").await;
    let (mut client, _) = app.login_as(Role::Customer).await;

    let res = client.post("/api/orders", checkout_body()).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    client
        .post("/api/cart/items", json!({ "productId": jam.id, "quantity": 2 }))
        .await;
    client
        .post("/api/cart/items", json!({ "productId": tea.id, "quantity": 1 }))
        .await;

    let res = client.post("/api/orders", checkout_body()).await;
    assert_eq!(res.status, StatusCode::CREATED);
    let order = &res.body["order"];
    assert_eq!(decimal(&order["total"]), Decimal::new(2199, 2));
    assert_eq!(order["status"], "pending");
    assert_eq!(order["billingAddress"], "12 Bramble Row");
    assert_eq!(order["isPaid"], true);
    assert!(order["paidAt"].is_string());
    assert_eq!(res.body["items"].as_array().unwrap().len(), 2);

    // Later price changes do not reach the placed order.
    app.storage()
        .update_product(
            jam.id,
            ProductUpdate {
                price: Some(Decimal::new(900, 2)),
                ..ProductUpdate::default()
            },
        )
        .await
        .unwrap();

    let res = client.get(&format!("/api/orders/{}", order["id"])).await;
    assert_eq!(res.status, StatusCode::OK);
    let jam_line = res.body["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|item| item["productId"] == json!(jam.id))
        .unwrap();
    assert_eq!(decimal(&jam_line["price"]), Decimal::new(650, 2));
    assert_eq!(jam_line["name"], "Bramble Jam");

    let res = client.get("/api/cart").await;
    assert_eq!(res.body["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_checkout_validates_details() {
    let app = TestApp::new();
    let jam = app.product("Bramble Jam", "6.50").await;
    let (mut client, _) = app.login_as(Role::Customer).await;
    client
        .post("/api/cart/items", json!({ "productId": jam.id }))
        .await;

    let res = client
        .post(
            "/api/orders",
            json!({ "shippingAddress": "x", "paymentMethod": "card" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = client.get("/api/orders").await;
    assert!(res.body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_orders_are_visible_to_owner_and_admin() {
    let app = TestApp::new();
    let jam = app.product("Bramble Jam", "6.50").await;
    let (mut owner, _) = app.login_as(Role::Customer).await;
    let (mut other, _) = app.login_as(Role::Customer).await;
    let (mut admin, _) = app.login_as(Role::Admin).await;

    owner
        .post("/api/cart/items", json!({ "productId": jam.id }))
        .await;
    let res = owner.post("/api/orders", checkout_body()).await;
    let uri = format!("/api/orders/{}", res.body["order"]["id"]);

    assert_eq!(owner.get(&uri).await.status, StatusCode::OK);
    assert_eq!(other.get(&uri).await.status, StatusCode::NOT_FOUND);
    assert_eq!(admin.get(&uri).await.status, StatusCode::OK);

    assert_eq!(owner.get("/api/orders").await.body.as_array().unwrap().len(), 1);
    assert!(other.get("/api/orders").await.body.as_array().unwrap().is_empty());
    assert_eq!(admin.get("/api/orders").await.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_order_status_is_admin_only() {
    let app = TestApp::new();
    let jam = app.product("Bramble Jam", "6.50").await;
    let (mut owner, _) = app.login_as(Role::Customer).await;
    let (mut admin, _) = app.login_as(Role::Admin).await;

    owner
        .post("/api/cart/items", json!({ "productId": jam.id }))
        .await;
    let res = owner.post("/api/orders", checkout_body()).await;
    let uri = format!("/api/orders/{}/status", res.body["order"]["id"]);

    let res = owner.put(&uri, json!({ "status": "shipped" })).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = admin.put(&uri, json!({ "status": "refunded" })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = admin.put(&uri, json!({ "status": "shipped" })).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "shipped");

    let res = admin
        .put("/api/orders/9999/status", json!({ "status": "shipped" }))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleted_product_leaves_nothing_to_check_out() {
    let app = TestApp::new();
    let jam = app.product("Bramble Jam", "6.50").await;
    let (mut client, _) = app.login_as(Role::Customer).await;
    client
        .post("/api/cart/items", json!({ "productId": jam.id }))
        .await;

    // Deleting the product drops its cart line, leaving nothing to buy.
    assert!(app.storage().delete_product(jam.id).await.unwrap());
    let res = client.post("/api/orders", checkout_body()).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}
