//! Integration test support for Bramble.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process API tests and the in-memory storage contract
//! cargo test -p bramble-integration-tests
//!
//! # Also run the storage contract against PostgreSQL
//! BRAMBLE_TEST_DATABASE_URL=postgres://localhost/bramble_test \
//!     cargo test -p bramble-integration-tests
//! ```
//!
//! API tests drive the real router with `tower::ServiceExt::oneshot`. No
//! socket is opened; [`TestClient`] carries the session cookie between
//! requests the way a browser would.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use bramble_core::models::{NewProduct, Product};
use bramble_core::{MemoryStorage, Role, Storage};
use bramble_storefront::config::StorefrontConfig;
use bramble_storefront::db::PgStorage;
use bramble_storefront::middleware::memory_session_layer;
use bramble_storefront::routes;
use bramble_storefront::services::auth::{AuthService, Registration};
use bramble_storefront::state::AppState;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

/// Password used for every account the helpers create.
pub const TEST_PASSWORD: &str = "test_password";

/// Return an email address no other test in this process has used.
///
/// The timestamp keeps addresses unique across runs against a shared
/// database as well.
pub fn unique_email(prefix: &str) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let stamp = chrono::Utc::now().timestamp_micros();
    format!("{prefix}_{stamp}_{n}@example.com")
}

/// A product input that passes validation.
pub fn sample_product(name: &str, price: &str) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        description: format!("{name}, made in small batches."),
        price: price.parse::<Decimal>().unwrap(),
        image_url: None,
        stock: 10,
    }
}

/// Connect to the contract-test database, if one is configured.
///
/// Runs the storefront migrations first. Returns `None` when
/// `BRAMBLE_TEST_DATABASE_URL` is unset so the Postgres half of the
/// contract suite is skipped.
pub async fn pg_storage() -> Option<PgStorage> {
    let url = std::env::var("BRAMBLE_TEST_DATABASE_URL").ok()?;
    let pool = bramble_storefront::db::create_pool(&SecretString::from(url))
        .await
        .expect("Failed to connect to BRAMBLE_TEST_DATABASE_URL");

    sqlx::migrate!("../storefront/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Some(PgStorage::new(pool))
}

/// The storefront router over a fresh in-memory store.
pub struct TestApp {
    router: Router,
    storage: Arc<MemoryStorage>,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    pub fn new() -> Self {
        let config = StorefrontConfig::in_memory();
        let session_layer = memory_session_layer(&config);
        let storage = Arc::new(MemoryStorage::new());
        let state = AppState::new(config, storage.clone());

        Self {
            router: routes::app(state, session_layer),
            storage,
        }
    }

    /// Direct access to the backing store, bypassing HTTP.
    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// A client with no session.
    pub fn client(&self) -> TestClient {
        TestClient {
            router: self.router.clone(),
            cookie: None,
        }
    }

    /// Create an account directly in storage and log a client in as it.
    pub async fn login_as(&self, role: Role) -> (TestClient, Value) {
        let email = unique_email(role.as_str());
        AuthService::new(self.storage())
            .create_account(
                Registration {
                    email: email.clone(),
                    password: TEST_PASSWORD.to_string(),
                    first_name: "Test".to_string(),
                    last_name: "User".to_string(),
                },
                role,
            )
            .await
            .unwrap();

        let mut client = self.client();
        let res = client
            .post(
                "/api/auth/login",
                serde_json::json!({ "email": email, "password": TEST_PASSWORD }),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK, "login failed: {}", res.body);
        (client, res.body)
    }

    /// Insert a product directly in storage.
    pub async fn product(&self, name: &str, price: &str) -> Product {
        self.storage()
            .create_product(sample_product(name, price))
            .await
            .unwrap()
    }
}

/// Status and decoded JSON body of one response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Sends requests through the router, remembering the session cookie.
pub struct TestClient {
    router: Router,
    cookie: Option<String>,
}

impl TestClient {
    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&mut self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&mut self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&mut self, uri: &str) -> TestResponse {
        self.send(Method::DELETE, uri, None).await
    }

    /// Send a raw body with a JSON content type.
    pub async fn post_raw(&mut self, uri: &str, body: &'static str) -> TestResponse {
        let request = self
            .request(Method::POST, uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        self.dispatch(request).await
    }

    async fn send(&mut self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let builder = self.request(method, uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        self.dispatch(request).await
    }

    fn request(&self, method: Method, uri: &str) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(uri);
        match &self.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    async fn dispatch(&mut self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie
                .to_str()
                .unwrap()
                .split(';')
                .next()
                .unwrap_or_default()
                .to_string();
            self.cookie = Some(pair);
        }

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse { status, body }
    }
}
