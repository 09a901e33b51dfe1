//! Cart store implementation.

use std::sync::Arc;

use rocketshoes_core::{Cart, CartItemError, LineItem, ProductId};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use super::locks::ProductLocks;
use super::{CART_STORAGE_KEY, UpdateProductAmount};
use crate::catalog::Catalog;
use crate::error::{CartError, FailureCause};
use crate::notify::Notifier;
use crate::storage::{KeyValueStore, StorageError};

/// Shopping cart state container.
///
/// Owns the cart for the session, rehydrates it from storage on construction
/// and writes a full snapshot after every committed change. Cheap to clone;
/// clones share the same cart.
///
/// Each operation comes in two forms: `try_*` returns a typed [`CartError`],
/// while the plain form logs the error and hands its message to the
/// [`Notifier`], returning nothing.
pub struct CartStore<C, S, N> {
    inner: Arc<CartStoreInner<C, S, N>>,
}

struct CartStoreInner<C, S, N> {
    catalog: C,
    storage: S,
    notifier: N,
    storage_key: String,
    state: watch::Sender<Cart>,
    locks: ProductLocks,
}

impl<C, S, N> Clone for CartStore<C, S, N> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C, S, N> std::fmt::Debug for CartStore<C, S, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("storage_key", &self.inner.storage_key)
            .field("items", &self.inner.state.borrow().len())
            .finish_non_exhaustive()
    }
}

impl<C, S, N> CartStore<C, S, N>
where
    C: Catalog,
    S: KeyValueStore,
    N: Notifier,
{
    /// Create a store whose snapshot lives under [`CART_STORAGE_KEY`].
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the storage backend cannot be read.
    pub fn new(catalog: C, storage: S, notifier: N) -> Result<Self, StorageError> {
        Self::with_storage_key(catalog, storage, notifier, CART_STORAGE_KEY)
    }

    /// Create a store whose snapshot lives under `storage_key`.
    ///
    /// A snapshot that cannot be parsed, or that holds duplicate products or
    /// zero amounts, is discarded and the cart starts empty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the storage backend cannot be read.
    pub fn with_storage_key(
        catalog: C,
        storage: S,
        notifier: N,
        storage_key: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let storage_key = storage_key.into();
        let cart = load_snapshot(&storage, &storage_key)?;

        debug!(
            storage_key = %storage_key,
            items = cart.len(),
            "Cart store initialized"
        );

        let (state, _) = watch::channel(cart);

        Ok(Self {
            inner: Arc::new(CartStoreInner {
                catalog,
                storage,
                notifier,
                storage_key,
                state,
                locks: ProductLocks::default(),
            }),
        })
    }

    /// Current contents of the cart.
    #[must_use]
    pub fn cart(&self) -> Cart {
        self.inner.state.borrow().clone()
    }

    /// Watch the cart. The receiver is woken after every committed change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.inner.state.subscribe()
    }

    /// Key under which the snapshot is stored.
    #[must_use]
    pub fn storage_key(&self) -> &str {
        &self.inner.storage_key
    }

    // =========================================================================
    // Add
    // =========================================================================

    /// Add one unit of a product, reporting failures to the notifier.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_product(&self, product_id: ProductId) {
        if let Err(error) = self.try_add_product(product_id).await {
            self.report(&error);
        }
    }

    /// Add one unit of a product.
    ///
    /// A product already in the cart is incremented if stock allows; a new
    /// product is looked up in the catalog and inserted first with amount 1.
    ///
    /// # Errors
    ///
    /// `StockUnavailable` when stock cannot cover the increment, `AddFailed`
    /// when a lookup or the snapshot write fails.
    pub async fn try_add_product(&self, product_id: ProductId) -> Result<(), CartError> {
        let _guard = self.inner.locks.acquire(product_id).await;

        match self.current_amount(product_id) {
            Some(amount) => self.increment(product_id, amount).await,
            None => self.insert(product_id).await,
        }
    }

    async fn increment(&self, product_id: ProductId, current: u32) -> Result<(), CartError> {
        let add_failed = |source: FailureCause| CartError::AddFailed { product_id, source };

        let stock = self
            .inner
            .catalog
            .get_stock(product_id)
            .await
            .map_err(|e| add_failed(e.into()))?;

        let requested = i64::from(current) + 1;
        if !stock.covers(requested) {
            return Err(CartError::StockUnavailable {
                product_id,
                requested,
                available: stock.amount,
            });
        }

        let amount = current
            .checked_add(1)
            .ok_or_else(|| add_failed(FailureCause::AmountOutOfRange(requested)))?;

        self.commit(|cart| cart.set_amount(product_id, amount))
            .map_err(add_failed)?;

        info!(amount, "Incremented product in cart");
        Ok(())
    }

    async fn insert(&self, product_id: ProductId) -> Result<(), CartError> {
        let add_failed = |source: FailureCause| CartError::AddFailed { product_id, source };

        let product = self
            .inner
            .catalog
            .get_product(product_id)
            .await
            .map_err(|e| add_failed(e.into()))?;

        if product.id != product_id {
            return Err(add_failed(FailureCause::UnexpectedProduct {
                requested: product_id,
                received: product.id,
            }));
        }

        let item = LineItem::from_product(product);
        self.commit(|cart| cart.prepend(item)).map_err(add_failed)?;

        info!("Added product to cart");
        Ok(())
    }

    // =========================================================================
    // Remove
    // =========================================================================

    /// Remove a product, reporting failures to the notifier.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub fn remove_product(&self, product_id: ProductId) {
        if let Err(error) = self.try_remove_product(product_id) {
            self.report(&error);
        }
    }

    /// Remove a product's line item. Makes no catalog calls.
    ///
    /// # Errors
    ///
    /// `RemoveFailed` when the product is not in the cart or the snapshot
    /// write fails.
    pub fn try_remove_product(&self, product_id: ProductId) -> Result<(), CartError> {
        self.commit(|cart| cart.remove(product_id).map(|_| ()))
            .map_err(|source| CartError::RemoveFailed { product_id, source })?;

        info!("Removed product from cart");
        Ok(())
    }

    // =========================================================================
    // Update amount
    // =========================================================================

    /// Set a product's quantity, reporting failures to the notifier.
    #[instrument(skip(self), fields(product_id = %update.product_id, amount = update.amount))]
    pub async fn update_product_amount(&self, update: UpdateProductAmount) {
        if let Err(error) = self.try_update_product_amount(update).await {
            self.report(&error);
        }
    }

    /// Set a product's quantity to `amount` if stock allows.
    ///
    /// Amounts below 1 are ignored and return `Ok` without touching anything.
    ///
    /// # Errors
    ///
    /// `StockUnavailable` when stock cannot cover `amount`, `UpdateFailed`
    /// when the product is not in the cart or the stock check or snapshot
    /// write fails.
    pub async fn try_update_product_amount(
        &self,
        update: UpdateProductAmount,
    ) -> Result<(), CartError> {
        let UpdateProductAmount { product_id, amount } = update;

        if amount < 1 {
            debug!(amount, "Ignoring non-positive amount");
            return Ok(());
        }

        let update_failed = |source: FailureCause| CartError::UpdateFailed { product_id, source };

        let _guard = self.inner.locks.acquire(product_id).await;

        if self.current_amount(product_id).is_none() {
            return Err(update_failed(CartItemError::Missing(product_id).into()));
        }

        let stock = self
            .inner
            .catalog
            .get_stock(product_id)
            .await
            .map_err(|e| update_failed(e.into()))?;

        if !stock.covers(amount) {
            return Err(CartError::StockUnavailable {
                product_id,
                requested: amount,
                available: stock.amount,
            });
        }

        let new_amount = u32::try_from(amount)
            .map_err(|_| update_failed(FailureCause::AmountOutOfRange(amount)))?;

        self.commit(|cart| cart.set_amount(product_id, new_amount))
            .map_err(update_failed)?;

        info!(amount, "Updated product amount");
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn current_amount(&self, product_id: ProductId) -> Option<u32> {
        self.inner
            .state
            .borrow()
            .get(product_id)
            .map(|item| item.amount)
    }

    /// Apply `mutate` to the current cart and persist the result.
    ///
    /// Memory is only replaced, and subscribers only woken, once the snapshot
    /// write has succeeded. The watch lock is held throughout, so commits are
    /// serialized and always start from the latest cart.
    fn commit(
        &self,
        mutate: impl FnOnce(&mut Cart) -> Result<(), CartItemError>,
    ) -> Result<(), FailureCause> {
        let mut outcome = Ok(());

        self.inner.state.send_if_modified(|current| {
            let mut next = current.clone();

            outcome = mutate(&mut next)
                .map_err(FailureCause::from)
                .and_then(|()| self.persist(&next).map_err(FailureCause::from));

            if outcome.is_ok() {
                *current = next;
                true
            } else {
                false
            }
        });

        outcome
    }

    fn persist(&self, cart: &Cart) -> Result<(), StorageError> {
        let snapshot = serde_json::to_string(cart)?;
        self.inner
            .storage
            .set_item(&self.inner.storage_key, &snapshot)
    }

    fn report(&self, error: &CartError) {
        match error.cause() {
            Some(cause) => warn!(
                product_id = %error.product_id(),
                kind = ?error.kind(),
                cause = %cause,
                "Cart operation failed"
            ),
            None => warn!(
                product_id = %error.product_id(),
                kind = ?error.kind(),
                "Cart operation rejected"
            ),
        }

        self.inner.notifier.notify_error(&error.to_string());
    }
}

/// Read the persisted cart, falling back to empty when absent or unusable.
fn load_snapshot<S: KeyValueStore>(storage: &S, key: &str) -> Result<Cart, StorageError> {
    let Some(snapshot) = storage.get_item(key)? else {
        return Ok(Cart::new());
    };

    match serde_json::from_str::<Cart>(&snapshot) {
        Ok(cart) => Ok(cart),
        Err(e) => {
            warn!(
                storage_key = key,
                error = %e,
                "Discarding unreadable cart snapshot"
            );
            Ok(Cart::new())
        }
    }
}
