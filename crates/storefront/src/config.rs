//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `ROCKETSHOES_API_URL` - Catalog API base URL (default: `http://localhost:3333`)
//! - `ROCKETSHOES_API_TOKEN` - Bearer token sent to the catalog API
//! - `ROCKETSHOES_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: none)
//! - `ROCKETSHOES_PRODUCT_CACHE_TTL_SECS` - Enables the product cache with this TTL (default: off)
//! - `ROCKETSHOES_PRODUCT_CACHE_CAPACITY` - Product cache size when enabled (default: 1000)
//! - `ROCKETSHOES_STORAGE_PATH` - Cart storage file (default: `.rocketshoes/storage.json`)
//! - `ROCKETSHOES_CART_KEY` - Storage key of the cart snapshot (default: `@RocketShoes:cart`)
//! - `ROCKETSHOES_CURRENCY` - Display currency (default: `BRL`)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rocketshoes_core::CurrencyCode;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::cart::CART_STORAGE_KEY;

const DEFAULT_API_URL: &str = "http://localhost:3333";
const DEFAULT_STORAGE_PATH: &str = ".rocketshoes/storage.json";
const DEFAULT_PRODUCT_CACHE_CAPACITY: u64 = 1000;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Catalog API configuration
    pub catalog: CatalogConfig,
    /// Cart persistence configuration
    pub storage: StorageConfig,
    /// Currency used when formatting prices
    pub currency: CurrencyCode,
}

/// Catalog (product and stock) API configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct CatalogConfig {
    /// Base URL, always ending with `/`
    pub base_url: Url,
    /// Optional bearer token
    pub api_token: Option<SecretString>,
    /// Per-request timeout; `None` waits indefinitely
    pub request_timeout: Option<Duration>,
    /// How long product lookups stay cached; `None` disables the cache
    pub product_cache_ttl: Option<Duration>,
    /// Maximum number of cached products
    pub product_cache_capacity: u64,
}

impl std::fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("base_url", &self.base_url.as_str())
            .field(
                "api_token",
                &self.api_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_timeout", &self.request_timeout)
            .field("product_cache_ttl", &self.product_cache_ttl)
            .field("product_cache_capacity", &self.product_cache_capacity)
            .finish()
    }
}

impl CatalogConfig {
    /// Configuration for `base_url` with every other setting at its default.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `base_url` is not an absolute URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("ROCKETSHOES_API_URL", base_url)?,
            api_token: None,
            request_timeout: None,
            product_cache_ttl: None,
            product_cache_capacity: DEFAULT_PRODUCT_CACHE_CAPACITY,
        })
    }
}

/// Cart persistence configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// JSON file backing the key-value store
    pub path: PathBuf,
    /// Key under which the cart snapshot is stored
    pub cart_key: String,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let catalog = CatalogConfig {
            base_url: parse_base_url(
                "ROCKETSHOES_API_URL",
                &env.get_or_default("ROCKETSHOES_API_URL", DEFAULT_API_URL),
            )?,
            api_token: env.get("ROCKETSHOES_API_TOKEN").map(SecretString::from),
            request_timeout: env
                .parse::<u64>("ROCKETSHOES_REQUEST_TIMEOUT_SECS")?
                .map(Duration::from_secs),
            product_cache_ttl: env
                .parse::<u64>("ROCKETSHOES_PRODUCT_CACHE_TTL_SECS")?
                .map(Duration::from_secs),
            product_cache_capacity: env
                .parse::<u64>("ROCKETSHOES_PRODUCT_CACHE_CAPACITY")?
                .unwrap_or(DEFAULT_PRODUCT_CACHE_CAPACITY),
        };

        let storage = StorageConfig {
            path: PathBuf::from(env.get_or_default("ROCKETSHOES_STORAGE_PATH", DEFAULT_STORAGE_PATH)),
            cart_key: env.get_or_default("ROCKETSHOES_CART_KEY", CART_STORAGE_KEY),
        };

        let currency = env
            .parse::<CurrencyCode>("ROCKETSHOES_CURRENCY")?
            .unwrap_or_default();

        Ok(Self {
            catalog,
            storage,
            currency,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup with the usual defaulting and parsing helpers.
struct Env<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Get an optional variable, treating blank values as unset.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse an optional variable.
    fn parse<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|value| {
                value
                    .trim()
                    .parse::<T>()
                    .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
            })
            .transpose()
    }
}

/// Parse a base URL, appending a trailing `/` so relative joins keep the path.
fn parse_base_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.catalog.base_url.as_str(), "http://localhost:3333/");
        assert!(config.catalog.api_token.is_none());
        assert!(config.catalog.request_timeout.is_none());
        assert!(config.catalog.product_cache_ttl.is_none());
        assert_eq!(config.catalog.product_cache_capacity, 1000);
        assert_eq!(config.storage.path, PathBuf::from(".rocketshoes/storage.json"));
        assert_eq!(config.storage.cart_key, "@RocketShoes:cart");
        assert_eq!(config.currency, CurrencyCode::BRL);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("ROCKETSHOES_API_URL", "https://api.example.com/v1"),
            ("ROCKETSHOES_REQUEST_TIMEOUT_SECS", "5"),
            ("ROCKETSHOES_PRODUCT_CACHE_TTL_SECS", "60"),
            ("ROCKETSHOES_CART_KEY", "cart"),
            ("ROCKETSHOES_CURRENCY", "usd"),
        ])
        .unwrap();

        assert_eq!(config.catalog.base_url.as_str(), "https://api.example.com/v1/");
        assert_eq!(config.catalog.request_timeout, Some(Duration::from_secs(5)));
        assert_eq!(
            config.catalog.product_cache_ttl,
            Some(Duration::from_secs(60))
        );
        assert_eq!(config.storage.cart_key, "cart");
        assert_eq!(config.currency, CurrencyCode::USD);
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = config_from(&[("ROCKETSHOES_CART_KEY", "  ")]).unwrap();
        assert_eq!(config.storage.cart_key, "@RocketShoes:cart");
    }

    #[test]
    fn test_invalid_values() {
        let err = config_from(&[("ROCKETSHOES_REQUEST_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "ROCKETSHOES_REQUEST_TIMEOUT_SECS"));

        assert!(config_from(&[("ROCKETSHOES_API_URL", "not a url")]).is_err());
        assert!(config_from(&[("ROCKETSHOES_API_URL", "mailto:shop@example.com")]).is_err());
        assert!(config_from(&[("ROCKETSHOES_CURRENCY", "XYZ")]).is_err());
    }

    #[test]
    fn test_catalog_config_debug_redacts_token() {
        let mut config = CatalogConfig::new("http://localhost:3333").unwrap();
        config.api_token = Some(SecretString::from("super_secret_token"));

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("localhost:3333"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_token"));
    }
}
