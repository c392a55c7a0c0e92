//! Synchronized decorator (§4.11): serializes every call through a single
//! lock, for delegate implementations that are not otherwise thread-safe.
//! Most decorators in this crate manage their own interior locking and do
//! not need this; it exists for wrapping externally-supplied `Cache` impls
//! that make no such guarantee.

use std::sync::{Arc, Mutex};

use sqlcraft_core::value::Value;
use sqlcraft_mapping::CacheKey;

use crate::cache::Cache;

/// Wraps every call to `delegate` in a single mutex.
#[derive(Debug)]
pub struct SynchronizedCache {
    delegate: Arc<dyn Cache>,
    lock: Mutex<()>,
}

impl SynchronizedCache {
    /// Wraps `delegate`.
    pub fn new(delegate: Arc<dyn Cache>) -> Self {
        Self {
            delegate,
            lock: Mutex::new(()),
        }
    }
}

impl Cache for SynchronizedCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn get(&self, key: &CacheKey) -> Option<Value> {
        let _guard = self.lock.lock().expect("synchronized cache mutex poisoned");
        self.delegate.get(key)
    }

    fn put(&self, key: CacheKey, value: Value) {
        let _guard = self.lock.lock().expect("synchronized cache mutex poisoned");
        self.delegate.put(key, value);
    }

    fn remove(&self, key: &CacheKey) -> Option<Value> {
        let _guard = self.lock.lock().expect("synchronized cache mutex poisoned");
        self.delegate.remove(key)
    }

    fn clear(&self) {
        let _guard = self.lock.lock().expect("synchronized cache mutex poisoned");
        self.delegate.clear();
    }

    fn size(&self) -> usize {
        let _guard = self.lock.lock().expect("synchronized cache mutex poisoned");
        self.delegate.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PerpetualCache;
    use serde_json::json;

    #[test]
    fn delegates_every_call() {
        let cache = SynchronizedCache::new(Arc::new(PerpetualCache::new("Users")));
        let key = CacheKey::new("Users.selectById", 0, -1, "sql", vec![json!(1)], None);
        cache.put(key.clone(), json!(1));
        assert_eq!(cache.get(&key), Some(json!(1)));
        assert_eq!(cache.size(), 1);
    }
}
