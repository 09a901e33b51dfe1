//! Integration tests for RocketShoes.
//!
//! The tests under `tests/` run the real [`CatalogClient`] and [`CartStore`]
//! against [`FakeCatalogApi`], an `axum` server on an ephemeral local port
//! that serves the same `products/{id}` and `stock/{id}` routes as the real
//! catalog API.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p rocketshoes-integration-tests
//! ```
//!
//! [`CatalogClient`]: rocketshoes_storefront::catalog::CatalogClient
//! [`CartStore`]: rocketshoes_storefront::CartStore

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use rocketshoes_core::{Product, ProductId};
use rocketshoes_storefront::config::CatalogConfig;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// How the fake API should misbehave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Answer every request with `500 Internal Server Error`.
    ServerError,
    /// Answer every request with `429` and the given `Retry-After`.
    RateLimited(u64),
    /// Answer every request with `200` and a body that is not JSON.
    Garbage,
}

#[derive(Default)]
struct ApiState {
    products: Mutex<HashMap<ProductId, Product>>,
    stock: Mutex<HashMap<ProductId, i64>>,
    failure: Mutex<Option<Failure>>,
    authorization: Mutex<Option<String>>,
    product_hits: AtomicUsize,
    stock_hits: AtomicUsize,
}

impl ApiState {
    fn failure(&self) -> Option<Failure> {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_authorization(&self, headers: &HeaderMap) {
        let value = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        *self
            .authorization
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = value;
    }
}

/// In-process stand-in for the catalog API.
///
/// Stock responses carry only `amount`, the minimal payload the real API
/// guarantees.
///
/// The server task is aborted when the value is dropped.
pub struct FakeCatalogApi {
    addr: SocketAddr,
    state: Arc<ApiState>,
    server: JoinHandle<()>,
}

impl FakeCatalogApi {
    /// Bind to an ephemeral port on localhost and start serving.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = Arc::new(ApiState::default());

        let app = Router::new()
            .route("/products/{id}", get(product))
            .route("/stock/{id}", get(stock))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Fake catalog API stopped");
            }
        });

        Ok(Self {
            addr,
            state,
            server,
        })
    }

    /// Base URL to point a [`CatalogConfig`] at.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Catalog configuration for this server with default settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the base URL is rejected.
    pub fn catalog_config(
        &self,
    ) -> Result<CatalogConfig, rocketshoes_storefront::config::ConfigError> {
        CatalogConfig::new(&self.base_url())
    }

    /// Register a product and its stock.
    pub fn insert_product(&self, product: Product, stock: i64) {
        let id = product.id;
        self.state
            .products
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, product);
        self.set_stock(id, stock);
    }

    /// Change the stock of a product.
    pub fn set_stock(&self, id: ProductId, amount: i64) {
        self.state
            .stock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, amount);
    }

    /// Make every following request fail, or pass `None` to recover.
    pub fn fail_with(&self, failure: Option<Failure>) {
        *self
            .state
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = failure;
    }

    /// Requests received on `products/{id}`.
    #[must_use]
    pub fn product_hits(&self) -> usize {
        self.state.product_hits.load(Ordering::SeqCst)
    }

    /// Requests received on `stock/{id}`.
    #[must_use]
    pub fn stock_hits(&self) -> usize {
        self.state.stock_hits.load(Ordering::SeqCst)
    }

    /// `Authorization` header of the most recent request.
    #[must_use]
    pub fn last_authorization(&self) -> Option<String> {
        self.state
            .authorization
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for FakeCatalogApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn product(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<ProductId>,
    headers: HeaderMap,
) -> Response {
    state.product_hits.fetch_add(1, Ordering::SeqCst);
    state.record_authorization(&headers);

    if let Some(failure) = state.failure() {
        return failure_response(failure);
    }

    let product = state
        .products
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
        .cloned();

    match product {
        Some(product) => Json(product).into_response(),
        None => (StatusCode::NOT_FOUND, Json(serde_json::json!({}))).into_response(),
    }
}

async fn stock(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<ProductId>,
    headers: HeaderMap,
) -> Response {
    state.stock_hits.fetch_add(1, Ordering::SeqCst);
    state.record_authorization(&headers);

    if let Some(failure) = state.failure() {
        return failure_response(failure);
    }

    let amount = state
        .stock
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
        .copied();

    match amount {
        Some(amount) => Json(serde_json::json!({ "amount": amount })).into_response(),
        None => (StatusCode::NOT_FOUND, Json(serde_json::json!({}))).into_response(),
    }
}

fn failure_response(failure: Failure) -> Response {
    match failure {
        Failure::ServerError => {
            (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response()
        }
        Failure::RateLimited(retry_after) => (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry_after.to_string())],
            "slow down",
        )
            .into_response(),
        Failure::Garbage => (StatusCode::OK, "<html>not json</html>").into_response(),
    }
}
