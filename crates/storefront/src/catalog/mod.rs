//! Product catalog and stock lookups.
//!
//! # Architecture
//!
//! - [`Catalog`] is the seam the cart store depends on: two reads, product by
//!   ID and stock by ID
//! - [`CatalogClient`] implements it over the REST catalog API with `reqwest`
//! - Product lookups are cached via `moka` (TTL from configuration); stock is
//!   always fetched fresh
//!
//! # Example
//!
//! ```rust,ignore
//! use rocketshoes_storefront::catalog::{Catalog, CatalogClient};
//!
//! let client = CatalogClient::new(&config.catalog)?;
//!
//! let product = client.get_product(ProductId::new(1)).await?;
//! let stock = client.get_stock(product.id).await?;
//! ```

mod client;

pub use client::CatalogClient;

use std::future::Future;
use std::sync::Arc;

use rocketshoes_core::{Product, ProductId, Stock};
use thiserror::Error;

/// Errors that can occur when talking to the catalog API.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Client configuration was rejected.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Read access to product attributes and stock levels.
pub trait Catalog: Send + Sync {
    /// Fetch a product's catalog attributes.
    fn get_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Product, CatalogError>> + Send;

    /// Fetch the units currently available for a product.
    fn get_stock(&self, id: ProductId) -> impl Future<Output = Result<Stock, CatalogError>> + Send;
}

impl<T: Catalog> Catalog for Arc<T> {
    fn get_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Product, CatalogError>> + Send {
        (**self).get_product(id)
    }

    fn get_stock(&self, id: ProductId) -> impl Future<Output = Result<Stock, CatalogError>> + Send {
        (**self).get_stock(id)
    }
}
