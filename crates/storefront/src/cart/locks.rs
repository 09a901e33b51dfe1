//! Per-product operation locks.
//!
//! Operations that check stock and then change an amount hold the product's
//! lock across the catalog call, so two of them on the same product run one
//! after the other. Operations on different products never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use rocketshoes_core::ProductId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub(crate) struct ProductLocks {
    locks: Mutex<HashMap<ProductId, Arc<AsyncMutex<()>>>>,
}

impl ProductLocks {
    /// Wait for exclusive access to `id`.
    pub(crate) async fn acquire(&self, id: ProductId) -> ProductGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(id).or_default())
        };

        let guard = Arc::clone(&lock).lock_owned().await;

        ProductGuard {
            locks: self,
            id,
            lock,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Held while an operation owns a product. Dropping it releases the product
/// and forgets the lock once nobody else is waiting on it.
pub(crate) struct ProductGuard<'a> {
    locks: &'a ProductLocks,
    id: ProductId,
    lock: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ProductGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut locks = self
            .locks
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Only the map and this guard still reference the lock.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.id);
        }
    }
}
