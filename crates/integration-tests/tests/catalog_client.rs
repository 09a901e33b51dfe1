//! Catalog client against the fake catalog API.
//!
//! Run with: cargo test -p rocketshoes-integration-tests

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use rocketshoes_core::{Price, Product, ProductId};
use rocketshoes_integration_tests::{FakeCatalogApi, Failure};
use rocketshoes_storefront::catalog::{Catalog, CatalogClient, CatalogError};
use rocketshoes_storefront::config::CatalogConfig;
use rust_decimal::Decimal;
use secrecy::SecretString;

fn shoe(id: i32) -> Product {
    Product {
        id: ProductId::new(id),
        title: format!("Shoe {id}"),
        price: Price::new(Decimal::new(1799, 1)),
        image: format!("https://cdn.example.com/{id}.jpg"),
    }
}

async fn setup() -> (FakeCatalogApi, CatalogClient) {
    let api = FakeCatalogApi::start().await.unwrap();
    let client = CatalogClient::new(&api.catalog_config().unwrap()).unwrap();
    (api, client)
}

async fn setup_cached() -> (FakeCatalogApi, CatalogClient) {
    let api = FakeCatalogApi::start().await.unwrap();
    let mut config = api.catalog_config().unwrap();
    config.product_cache_ttl = Some(Duration::from_secs(300));
    let client = CatalogClient::new(&config).unwrap();
    (api, client)
}

#[tokio::test]
async fn test_fetches_product_and_stock() {
    let (api, client) = setup().await;
    api.insert_product(shoe(1), 7);

    let product = client.get_product(ProductId::new(1)).await.unwrap();
    assert_eq!(product, shoe(1));

    let stock = client.get_stock(ProductId::new(1)).await.unwrap();
    assert_eq!(stock.amount, 7);
}

#[tokio::test]
async fn test_products_are_not_cached_by_default() {
    let (api, client) = setup().await;
    api.insert_product(shoe(1), 3);

    client.get_product(ProductId::new(1)).await.unwrap();
    client.get_product(ProductId::new(1)).await.unwrap();

    assert_eq!(api.product_hits(), 2);
}

#[tokio::test]
async fn test_products_are_cached_but_stock_is_not() {
    let (api, client) = setup_cached().await;
    api.insert_product(shoe(1), 3);

    client.get_product(ProductId::new(1)).await.unwrap();
    client.get_product(ProductId::new(1)).await.unwrap();
    assert_eq!(api.product_hits(), 1);

    client.get_stock(ProductId::new(1)).await.unwrap();
    api.set_stock(ProductId::new(1), 2);
    let stock = client.get_stock(ProductId::new(1)).await.unwrap();
    assert_eq!(api.stock_hits(), 2);
    assert_eq!(stock.amount, 2);
}

#[tokio::test]
async fn test_clones_share_product_cache() {
    let (api, client) = setup_cached().await;
    api.insert_product(shoe(1), 3);

    client.get_product(ProductId::new(1)).await.unwrap();
    client.clone().get_product(ProductId::new(1)).await.unwrap();

    assert_eq!(api.product_hits(), 1);
}

#[tokio::test]
async fn test_missing_product_is_not_found() {
    let (api, client) = setup().await;

    let err = client.get_product(ProductId::new(42)).await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(ref path) if path == "products/42"));

    let err = client.get_stock(ProductId::new(42)).await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(ref path) if path == "stock/42"));

    assert_eq!(api.product_hits(), 1);
}

#[tokio::test]
async fn test_rate_limit_carries_retry_after() {
    let (api, client) = setup().await;
    api.fail_with(Some(Failure::RateLimited(30)));

    let err = client.get_stock(ProductId::new(1)).await.unwrap_err();
    assert!(matches!(err, CatalogError::RateLimited(30)));
}

#[tokio::test]
async fn test_server_error_maps_to_status() {
    let (api, client) = setup().await;
    api.fail_with(Some(Failure::ServerError));

    let err = client.get_product(ProductId::new(1)).await.unwrap_err();
    match err {
        CatalogError::Status { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "upstream exploded");
        }
        other => panic!("expected Status, got {other:?}"),
    }
}

#[tokio::test]
async fn test_garbage_body_maps_to_parse() {
    let (api, client) = setup().await;
    api.fail_with(Some(Failure::Garbage));

    let err = client.get_stock(ProductId::new(1)).await.unwrap_err();
    assert!(matches!(err, CatalogError::Parse(_)));
}

#[tokio::test]
async fn test_failures_are_not_cached() {
    let (api, client) = setup_cached().await;
    api.insert_product(shoe(1), 3);
    api.fail_with(Some(Failure::ServerError));

    assert!(client.get_product(ProductId::new(1)).await.is_err());

    api.fail_with(None);
    assert_eq!(client.get_product(ProductId::new(1)).await.unwrap(), shoe(1));
    assert_eq!(api.product_hits(), 2);
}

#[tokio::test]
async fn test_sends_bearer_token() {
    let api = FakeCatalogApi::start().await.unwrap();
    api.insert_product(shoe(1), 1);

    let mut config = api.catalog_config().unwrap();
    config.api_token = Some(SecretString::from("s3cret-token"));
    let client = CatalogClient::new(&config).unwrap();

    client.get_stock(ProductId::new(1)).await.unwrap();

    assert_eq!(
        api.last_authorization().as_deref(),
        Some("Bearer s3cret-token")
    );
}

#[tokio::test]
async fn test_base_url_path_prefix_is_kept() {
    let api = FakeCatalogApi::start().await.unwrap();
    api.insert_product(shoe(1), 1);

    let config = CatalogConfig::new(&format!("{}/api", api.base_url())).unwrap();
    assert!(config.base_url.as_str().ends_with("/api/"));

    let client = CatalogClient::new(&config).unwrap();
    let err = client.get_product(ProductId::new(1)).await.unwrap_err();

    // The fake serves from the root, so a prefixed base URL must miss.
    assert!(matches!(err, CatalogError::NotFound(_)));
    assert_eq!(api.product_hits(), 0);
}

#[tokio::test]
async fn test_request_timeout_applies() {
    let api = FakeCatalogApi::start().await.unwrap();
    api.insert_product(shoe(1), 1);

    let mut config = api.catalog_config().unwrap();
    config.request_timeout = Some(Duration::from_secs(5));
    let client = CatalogClient::new(&config).unwrap();

    assert_eq!(client.get_stock(ProductId::new(1)).await.unwrap().amount, 1);
}
