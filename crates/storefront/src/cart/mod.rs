//! The shopping cart store.
//!
//! [`CartStore`] holds the shopper's cart, persists a snapshot of it after
//! every change, and checks stock with the catalog before any quantity goes
//! up. Failures never escape the notifying operations; they are reported
//! through a [`Notifier`](crate::notify::Notifier) instead.

mod locks;
mod store;

pub use store::CartStore;

use rocketshoes_core::ProductId;
use serde::{Deserialize, Serialize};

/// Storage key of the persisted cart snapshot.
pub const CART_STORAGE_KEY: &str = "@RocketShoes:cart";

/// Request to set a product's quantity.
///
/// `amount` is signed because callers may pass zero or negative values, which
/// are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductAmount {
    pub product_id: ProductId,
    pub amount: i64,
}
