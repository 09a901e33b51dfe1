//! Cart commands.
//!
//! Each invocation opens the file store, runs at most one cart operation and
//! prints whatever the shopper would have seen: notifications, then the cart.

use rocketshoes_core::{Cart, CurrencyCode, ProductId};
use rocketshoes_storefront::catalog::{CatalogClient, CatalogError};
use rocketshoes_storefront::config::{ConfigError, StorefrontConfig};
use rocketshoes_storefront::notify::ChannelNotifier;
use rocketshoes_storefront::storage::{FileStorage, StorageError};
use rocketshoes_storefront::{CartStore, UpdateProductAmount};
use thiserror::Error;
use tokio::sync::broadcast;

/// Notifications buffered for a single command.
const NOTIFICATION_CAPACITY: usize = 16;

/// Errors that prevent a cart session from starting.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog client error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// A cart store wired to the configured API and storage file.
pub struct Session {
    store: CartStore<CatalogClient, FileStorage, ChannelNotifier>,
    notifications: broadcast::Receiver<String>,
    currency: CurrencyCode,
}

impl Session {
    /// Load configuration and open the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid, the HTTP client cannot be
    /// built, or the storage file cannot be read.
    pub fn open() -> Result<Self, SessionError> {
        let config = StorefrontConfig::from_env()?;

        tracing::debug!(
            api = %config.catalog.base_url,
            storage = %config.storage.path.display(),
            "Opening cart"
        );

        let catalog = CatalogClient::new(&config.catalog)?;
        let storage = FileStorage::open(&config.storage.path)?;
        let notifier = ChannelNotifier::new(NOTIFICATION_CAPACITY);
        let notifications = notifier.subscribe();

        let store =
            CartStore::with_storage_key(catalog, storage, notifier, config.storage.cart_key)?;

        Ok(Self {
            store,
            notifications,
            currency: config.currency,
        })
    }

    pub async fn add(&self, id: ProductId) {
        self.store.add_product(id).await;
    }

    pub fn remove(&self, id: ProductId) {
        self.store.remove_product(id);
    }

    pub async fn update(&self, id: ProductId, amount: i64) {
        self.store
            .update_product_amount(UpdateProductAmount {
                product_id: id,
                amount,
            })
            .await;
    }

    /// Print pending notifications and the current cart.
    #[allow(clippy::print_stdout)]
    pub fn print(mut self) {
        while let Ok(message) = self.notifications.try_recv() {
            println!("! {message}");
        }

        print!("{}", render(&self.store.cart(), self.currency));
    }
}

/// Render the cart as a plain-text table.
fn render(cart: &Cart, currency: CurrencyCode) -> String {
    if cart.is_empty() {
        return "Cart is empty\n".to_string();
    }

    let mut out = String::new();
    for item in cart {
        out.push_str(&format!(
            "{:>5}  {:<32} {:>4} x {:>12} = {:>12}\n",
            item.id,
            item.title,
            item.amount,
            item.price.format(currency),
            item.subtotal().format(currency),
        ));
    }
    out.push_str(&format!(
        "Total ({} items): {}\n",
        cart.item_count(),
        cart.total().format(currency)
    ));
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rocketshoes_core::{LineItem, Price};
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_render_empty_cart() {
        assert_eq!(render(&Cart::new(), CurrencyCode::BRL), "Cart is empty\n");
    }

    #[test]
    fn test_render_lists_items_and_total() {
        let cart = Cart::try_from(vec![LineItem {
            id: ProductId::new(1),
            title: "Shoe".to_string(),
            price: Price::new(Decimal::new(1799, 1)),
            image: "x.png".to_string(),
            amount: 2,
        }])
        .unwrap();

        let output = render(&cart, CurrencyCode::BRL);

        assert!(output.contains("Shoe"));
        assert!(output.contains("R$ 179,90"));
        assert!(output.contains("R$ 359,80"));
        assert!(output.ends_with("Total (2 items): R$ 359,80\n"));
    }
}
