use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per product id. Holding the guard serialises the
/// read-check-write sequence on that product's stock.
#[derive(Debug, Clone, Default)]
pub struct ProductLocks {
    inner: Arc<DashMap<i32, Arc<Mutex<()>>>>,
}

impl ProductLocks {
    pub async fn acquire(&self, product_id: i32) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the map shard is not held across the await.
        let lock = self.inner.entry(product_id).or_default().clone();
        lock.lock_owned().await
    }

    /// Drops the entry of a product that turned out not to exist (or no
    /// longer exists). Entries still held or awaited by another caller stay.
    pub fn release_if_idle(&self, product_id: i32) {
        self.inner
            .remove_if(&product_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }
}
