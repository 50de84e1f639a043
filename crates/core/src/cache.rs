//! Typed loading cache.
//!
//! Concurrent callers asking for the same missing key share a single
//! in-flight load. Failed loads are not cached, so the next caller retries.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;

/// A cache of `V` keyed by `K`, filled on demand by a loader.
pub struct LoadingCache<K, V> {
    items: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> Default for LoadingCache<K, V> {
    fn default() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> LoadingCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached value, if it has been loaded.
    pub fn get(&self, key: &K) -> Option<V> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .and_then(|cell| cell.get().cloned())
    }

    /// The cached value, loading it with `loader` on a miss.
    pub async fn get_or_load<F, Fut, E>(&self, key: K, loader: F) -> Result<V, E>
    where
        F: FnOnce(K) -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let cell = {
            let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(items.entry(key.clone()).or_default())
        };
        let result = cell.get_or_try_init(|| loader(key.clone())).await.cloned();
        if result.is_err() {
            self.discard_failed(&key, &cell);
        }
        result
    }

    /// Drop the slot of a failed load unless another caller still holds it.
    fn discard_failed(&self, key: &K, cell: &Arc<OnceCell<V>>) {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        let unshared = items
            .get(key)
            .map(|current| Arc::ptr_eq(current, cell) && Arc::strong_count(cell) == 2)
            .unwrap_or(false);
        if unshared && !cell.initialized() {
            items.remove(key);
        }
    }

    /// Drop a cached value. Returns whether the key was present.
    pub fn remove(&self, key: &K) -> bool {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }

    pub fn clear(&self) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of loaded values.
    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn slots(&self) -> usize {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
