// src/locks.rs
//
// Keyed async locks. A capture holds its dosing record's lock across the
// whole read-compute-write, and ledger writes hold the material's lock, so
// concurrent requests on the same row serialize instead of interleaving.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct LockRegistry {
    inner: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for `key`, creating it on first use. The guard is
    /// owned so it can be held across awaits within a handler.
    pub async fn acquire(&self, key: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            Arc::clone(map.entry(key).or_default())
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn same_key_serializes() {
        let registry = Arc::new(LockRegistry::new());
        let in_critical = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            let in_critical = Arc::clone(&in_critical);
            handles.push(tokio::spawn(async move {
                let _guard = registry.acquire(7).await;
                assert!(!in_critical.swap(true, Ordering::SeqCst));
                tokio::task::yield_now().await;
                in_critical.store(false, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
    }

    #[tokio::test]
    async fn distinct_keys_do_not_block() {
        let registry = LockRegistry::new();
        let g1 = registry.acquire(1).await;
        // Would deadlock here if key 2 shared key 1's mutex.
        let g2 = registry.acquire(2).await;
        drop(g1);
        drop(g2);
    }

    #[tokio::test]
    async fn guard_release_unblocks_waiter() {
        let registry = Arc::new(LockRegistry::new());
        let guard = registry.acquire(3).await;

        let registry2 = Arc::clone(&registry);
        let waiter = tokio::spawn(async move {
            let _g = registry2.acquire(3).await;
        });

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        drop(guard);
        waiter.await.unwrap();
    }
}
