//! Cart operation errors.
//!
//! Every cart operation resolves to one of four coarse, user-facing kinds. The
//! `Display` of a [`CartError`] is exactly the message shown to the shopper;
//! the underlying [`FailureCause`] is only reachable through
//! [`std::error::Error::source`] and is meant for logs.

use rocketshoes_core::{CartItemError, ProductId};
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::storage::StorageError;

/// Message for [`CartErrorKind::StockUnavailable`].
pub const STOCK_UNAVAILABLE_MESSAGE: &str = "Requested quantity is out of stock";
/// Message for [`CartErrorKind::AddFailed`].
pub const ADD_FAILED_MESSAGE: &str = "Error adding product";
/// Message for [`CartErrorKind::RemoveFailed`].
pub const REMOVE_FAILED_MESSAGE: &str = "Error removing product";
/// Message for [`CartErrorKind::UpdateFailed`].
pub const UPDATE_FAILED_MESSAGE: &str = "Error changing product quantity";

/// Error returned by the `try_*` cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Requested or incremented quantity exceeds available stock.
    #[error("Requested quantity is out of stock")]
    StockUnavailable {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// Product lookup, stock check or persistence failed while adding.
    #[error("Error adding product")]
    AddFailed {
        product_id: ProductId,
        #[source]
        source: FailureCause,
    },

    /// Target product not in the cart, or persistence failed.
    #[error("Error removing product")]
    RemoveFailed {
        product_id: ProductId,
        #[source]
        source: FailureCause,
    },

    /// Target product not in the cart, stock check failed, or persistence failed.
    #[error("Error changing product quantity")]
    UpdateFailed {
        product_id: ProductId,
        #[source]
        source: FailureCause,
    },
}

impl CartError {
    /// The coarse category shown to the user.
    #[must_use]
    pub const fn kind(&self) -> CartErrorKind {
        match self {
            Self::StockUnavailable { .. } => CartErrorKind::StockUnavailable,
            Self::AddFailed { .. } => CartErrorKind::AddFailed,
            Self::RemoveFailed { .. } => CartErrorKind::RemoveFailed,
            Self::UpdateFailed { .. } => CartErrorKind::UpdateFailed,
        }
    }

    /// Product the failed operation targeted.
    #[must_use]
    pub const fn product_id(&self) -> ProductId {
        match self {
            Self::StockUnavailable { product_id, .. }
            | Self::AddFailed { product_id, .. }
            | Self::RemoveFailed { product_id, .. }
            | Self::UpdateFailed { product_id, .. } => *product_id,
        }
    }

    /// The underlying cause, if any.
    #[must_use]
    pub const fn cause(&self) -> Option<&FailureCause> {
        match self {
            Self::StockUnavailable { .. } => None,
            Self::AddFailed { source, .. }
            | Self::RemoveFailed { source, .. }
            | Self::UpdateFailed { source, .. } => Some(source),
        }
    }
}

/// User-facing error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CartErrorKind {
    StockUnavailable,
    AddFailed,
    RemoveFailed,
    UpdateFailed,
}

impl CartErrorKind {
    /// The message shown to the user for this category.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::StockUnavailable => STOCK_UNAVAILABLE_MESSAGE,
            Self::AddFailed => ADD_FAILED_MESSAGE,
            Self::RemoveFailed => REMOVE_FAILED_MESSAGE,
            Self::UpdateFailed => UPDATE_FAILED_MESSAGE,
        }
    }
}

/// What actually went wrong behind a `*Failed` error.
#[derive(Debug, Error)]
pub enum FailureCause {
    /// Product or stock lookup failed.
    #[error("catalog: {0}")]
    Catalog(#[from] CatalogError),

    /// Writing the cart snapshot failed.
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    /// The mutation broke a cart rule (missing or duplicate product).
    #[error("cart: {0}")]
    Cart(#[from] CartItemError),

    /// The requested amount does not fit a line item quantity.
    #[error("amount {0} is out of range")]
    AmountOutOfRange(i64),

    /// The catalog answered with a different product than the one requested.
    #[error("requested product {requested} but catalog returned {received}")]
    UnexpectedProduct {
        requested: ProductId,
        received: ProductId,
    },
}

impl FailureCause {
    /// Whether the failure was the product being absent from the cart.
    #[must_use]
    pub const fn is_not_in_cart(&self) -> bool {
        matches!(self, Self::Cart(CartItemError::Missing(_)))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_display_is_user_message() {
        let err = CartError::RemoveFailed {
            product_id: ProductId::new(999),
            source: CartItemError::Missing(ProductId::new(999)).into(),
        };

        assert_eq!(err.to_string(), "Error removing product");
        assert_eq!(err.kind(), CartErrorKind::RemoveFailed);
        assert_eq!(err.kind().message(), err.to_string());
        assert_eq!(err.product_id(), ProductId::new(999));
    }

    #[test]
    fn test_cause_is_reachable_as_source() {
        let err = CartError::UpdateFailed {
            product_id: ProductId::new(1),
            source: FailureCause::AmountOutOfRange(-3),
        };

        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("amount -3 is out of range"));
        assert!(!err.cause().is_some_and(FailureCause::is_not_in_cart));
    }

    #[test]
    fn test_stock_unavailable_has_no_cause() {
        let err = CartError::StockUnavailable {
            product_id: ProductId::new(1),
            requested: 5,
            available: 4,
        };

        assert_eq!(err.to_string(), "Requested quantity is out of stock");
        assert!(err.cause().is_none());
        assert!(err.source().is_none());
    }
}
