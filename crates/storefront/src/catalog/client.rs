//! REST catalog API client.
//!
//! Talks to the two read endpoints of the catalog API:
//! - `GET {base}/products/{id}` - product attributes
//! - `GET {base}/stock/{id}` - available units
//!
//! Products can be cached using `moka` when a TTL is configured; stock never
//! is.

use std::sync::Arc;

use moka::future::Cache;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use rocketshoes_core::{Product, ProductId, Stock};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::{Catalog, CatalogError};
use crate::config::CatalogConfig;

/// Longest slice of a response body kept in errors and logs.
const MAX_BODY_EXCERPT: usize = 200;

/// Client for the catalog API.
///
/// Cheap to clone; clones share the HTTP connection pool and product cache.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    base_url: Url,
    /// `None` when caching is disabled.
    products: Option<Cache<ProductId, Product>>,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field(
                "cached_products",
                &self.inner.products.as_ref().map(Cache::entry_count),
            )
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    /// Create a new catalog API client.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = &config.api_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| CatalogError::Config(format!("Invalid API token format: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let products = config.product_cache_ttl.map(|ttl| {
            Cache::builder()
                .max_capacity(config.product_cache_capacity)
                .time_to_live(ttl)
                .build()
        });

        Ok(Self {
            inner: Arc::new(CatalogClientInner {
                client: builder.build()?,
                base_url: config.base_url.clone(),
                products,
            }),
        })
    }

    /// GET a JSON resource relative to the base URL.
    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T, CatalogError> {
        let url = self.inner.base_url.join(path)?;

        let response = self.inner.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(path.to_string()));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(CatalogError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                path,
                body = %excerpt(&body),
                "Catalog API returned non-success status"
            );
            return Err(CatalogError::Status {
                status: status.as_u16(),
                message: excerpt(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                path,
                body = %excerpt(&body),
                "Failed to parse catalog API response"
            );
            CatalogError::Parse(e)
        })
    }
}

impl Catalog for CatalogClient {
    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        let Some(products) = &self.inner.products else {
            return self.fetch(&format!("products/{id}")).await;
        };

        if let Some(product) = products.get(&id).await {
            debug!("Cache hit for product");
            return Ok(product);
        }

        let product: Product = self.fetch(&format!("products/{id}")).await?;

        products.insert(id, product.clone()).await;

        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_stock(&self, id: ProductId) -> Result<Stock, CatalogError> {
        self.fetch(&format!("stock/{id}")).await
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(MAX_BODY_EXCERPT).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    #[test]
    fn test_new_client_with_token_and_timeout() {
        let mut config = CatalogConfig::new("http://localhost:3333").unwrap();
        config.api_token = Some(SecretString::from("abc123"));
        config.request_timeout = Some(std::time::Duration::from_secs(2));

        let client = CatalogClient::new(&config).unwrap();
        let debug_output = format!("{client:?}");

        assert!(debug_output.contains("http://localhost:3333/"));
        assert!(!debug_output.contains("abc123"));
    }

    #[test]
    fn test_rejects_token_with_newline() {
        let mut config = CatalogConfig::new("http://localhost:3333").unwrap();
        config.api_token = Some(SecretString::from("abc\n123"));

        assert!(matches!(
            CatalogClient::new(&config),
            Err(CatalogError::Config(_))
        ));
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        let body = "é".repeat(500);
        assert_eq!(excerpt(&body).chars().count(), MAX_BODY_EXCERPT);
    }
}
