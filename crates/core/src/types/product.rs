//! Catalog payloads returned by the product and stock endpoints.

use serde::{Deserialize, Serialize};

use crate::{Price, ProductId};

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub price: Price,
    /// Image URL.
    pub image: String,
}

/// Units of a product currently available.
///
/// The stock endpoint only promises `amount`; any other fields it sends are
/// ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    /// Signed so that an oversold or zeroed product is still representable.
    pub amount: i64,
}

impl Stock {
    /// Whether `requested` units can be taken from this stock.
    #[must_use]
    pub const fn covers(&self, requested: i64) -> bool {
        self.amount >= requested
    }
}
