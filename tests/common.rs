//! Common test utilities for integration tests.
//!
//! `MockBackend` serves the storefront REST API from an in-process axum
//! router on an ephemeral port and records what clients sent to it.
//!
//! # Example
//!
//! ```rust,ignore
//! #[tokio::test]
//! async fn test_products() {
//!     let backend = MockBackend::start().await;
//!     let api = HttpBackend::new(backend.client());
//!     assert_eq!(api.list_products().await.unwrap().len(), 3);
//! }
//! ```

#![allow(dead_code)]

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use storefront::api::ApiClient;
use storefront::config::{Config, StorageKind};
use storefront::model::{CartItem, CartLine, Product, ReportFormat, ReportRequest, User};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const PASSWORD: &str = "secret";

pub fn product(id: i64, name: &str, price: f64) -> Product {
    Product {
        id,
        name: name.to_string(),
        description: None,
        price,
        discount_percentage: None,
        discounted_price: None,
        stock: 10,
        category_id: Some(1),
        category_name: Some("Computo".to_string()),
        image_url: None,
    }
}

pub fn user(id: i64, username: &str) -> User {
    User {
        id,
        username: username.to_string(),
        email: format!("{username}@example.com"),
        role_id: Some(2),
        role_name: Some("cliente".to_string()),
        permissions: vec!["cart:write".to_string()],
    }
}

pub fn token_for(username: &str) -> String {
    format!("token-{username}")
}

/// Requests recorded by the mock, plus switches to make it misbehave.
#[derive(Default)]
pub struct Recorded {
    pub products: Mutex<Vec<Product>>,
    pub server_cart: Mutex<Vec<CartItem>>,
    pub cart_puts: Mutex<Vec<Vec<CartLine>>>,
    pub checkout_requests: Mutex<Vec<Vec<CartLine>>>,
    pub authorization: Mutex<Vec<Option<String>>>,
    pub product_gets: AtomicUsize,
    pub fail_products: AtomicBool,
    pub fail_logout: AtomicBool,
    pub reject_me: AtomicBool,
}

impl Recorded {
    fn record_auth(&self, headers: &HeaderMap) -> Option<String> {
        let value = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.authorization.lock().push(value.clone());
        value
    }

    fn authorized_user(&self, headers: &HeaderMap) -> Option<User> {
        let value = self.record_auth(headers)?;
        let username = value.strip_prefix("Bearer token-")?;
        Some(user(7, username))
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.authorization.lock().last().cloned().flatten()
    }
}

/// In-process REST backend.
///
/// The server task is aborted when dropped.
pub struct MockBackend {
    addr: SocketAddr,
    pub state: Arc<Recorded>,
    handle: JoinHandle<()>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state = Arc::new(Recorded::default());
        state.products.lock().extend([
            product(1, "Laptop Pro", 1500.0),
            product(2, "Laptop Air", 1100.0),
            product(3, "Mouse Inalámbrico", 25.0),
        ]);

        let app = Router::new()
            .route("/api/health", get(|| async { StatusCode::OK }))
            .route("/api/auth/login", post(login))
            .route("/api/auth/register", post(register))
            .route("/api/auth/me", get(me))
            .route("/api/auth/logout", post(logout))
            .route("/api/products", get(list_products))
            .route("/api/cart", get(get_cart).put(put_cart))
            .route("/api/checkout/session", post(checkout))
            .route("/api/reports", post(report))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener.local_addr().expect("Failed to read local addr");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.base_url(), Duration::from_secs(5)).expect("Failed to build client")
    }

    /// Client configuration pointing at this backend, with in-memory
    /// storage and no connectivity probe.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.backend.base_url = self.base_url();
        config.storage.backend = StorageKind::Memory;
        config.network.probe_enabled = false;
        config
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

type Shared = State<Arc<Recorded>>;

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

fn unauthorized(detail: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "detail": detail }))).into_response()
}

async fn login(Json(body): Json<Credentials>) -> Response {
    if body.password != PASSWORD {
        return unauthorized("Credenciales inválidas");
    }
    Json(json!({
        "user": user(7, &body.username),
        "access_token": token_for(&body.username),
    }))
    .into_response()
}

#[derive(Deserialize)]
struct RegisterBody {
    username: String,
    email: String,
    password: String,
}

async fn register(Json(body): Json<RegisterBody>) -> Response {
    if body.password.len() < 4 {
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "detail": "password too short" })))
            .into_response();
    }
    let mut created = user(8, &body.username);
    created.email = body.email;
    Json(json!({ "user": created, "token": token_for(&body.username) })).into_response()
}

async fn me(State(state): Shared, headers: HeaderMap) -> Response {
    if state.reject_me.load(Ordering::SeqCst) {
        return unauthorized("Token expirado");
    }
    match state.authorized_user(&headers) {
        Some(user) => Json(user).into_response(),
        None => unauthorized("Not authenticated"),
    }
}

async fn logout(State(state): Shared) -> StatusCode {
    if state.fail_logout.load(Ordering::SeqCst) {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::NO_CONTENT
    }
}

async fn list_products(State(state): Shared, headers: HeaderMap) -> Response {
    state.record_auth(&headers);
    state.product_gets.fetch_add(1, Ordering::SeqCst);
    if state.fail_products.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "message": "mantenimiento" })))
            .into_response();
    }
    Json(state.products.lock().clone()).into_response()
}

async fn get_cart(State(state): Shared, headers: HeaderMap) -> Response {
    if state.authorized_user(&headers).is_none() {
        return unauthorized("Not authenticated");
    }
    Json(json!({ "items": state.server_cart.lock().clone() })).into_response()
}

#[derive(Deserialize)]
struct CartBody {
    items: Vec<CartLine>,
}

async fn put_cart(State(state): Shared, headers: HeaderMap, Json(body): Json<CartBody>) -> Response {
    if state.authorized_user(&headers).is_none() {
        return unauthorized("Not authenticated");
    }
    let products = state.products.lock().clone();
    let accepted: Vec<CartItem> = body
        .items
        .iter()
        .filter_map(|line| {
            let product = products.iter().find(|p| p.id == line.product_id)?.clone();
            Some(CartItem {
                product,
                quantity: line.quantity,
            })
        })
        .collect();

    state.cart_puts.lock().push(body.items);
    *state.server_cart.lock() = accepted.clone();
    Json(json!({ "items": accepted })).into_response()
}

async fn checkout(State(state): Shared, headers: HeaderMap, Json(body): Json<CartBody>) -> Response {
    if state.authorized_user(&headers).is_none() {
        return unauthorized("Not authenticated");
    }
    state.checkout_requests.lock().push(body.items);
    Json(json!({ "session_id": "cs_test_1", "url": "https://pay.example.com/cs_test_1" }))
        .into_response()
}

async fn report(Json(request): Json<ReportRequest>) -> Response {
    match request.format {
        ReportFormat::Screen => {
            Json(json!({ "summary": format!("Resumen: {}", request.prompt) })).into_response()
        },
        ReportFormat::Pdf => (
            [
                (header::CONTENT_TYPE, "application/pdf"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"fallback.pdf\"; filename*=UTF-8''ventas%20mayo.pdf",
                ),
            ],
            b"%PDF-1.4 fake".to_vec(),
        )
            .into_response(),
        ReportFormat::Excel => (
            [(
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            )],
            vec![0x50_u8, 0x4b, 0x03, 0x04],
        )
            .into_response(),
    }
}

/// Polls `check` until it holds or `timeout` elapses.
pub async fn eventually<F: FnMut() -> bool>(timeout: Duration, mut check: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

/// JSON view of a value for assertions.
pub fn as_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).expect("serializable")
}
