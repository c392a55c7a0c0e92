//! LRU eviction decorator (§4.11): bounded by access order.

use std::sync::{Arc, Mutex};

use indexmap::IndexSet;
use sqlcraft_core::value::Value;
use sqlcraft_mapping::CacheKey;

use crate::cache::Cache;

/// Evicts the least-recently-accessed key once `capacity` is exceeded. Every
/// `get` hit and every `put` counts as an access, moving the key to the
/// most-recently-used end.
#[derive(Debug)]
pub struct LruCache {
    delegate: Arc<dyn Cache>,
    capacity: usize,
    order: Mutex<IndexSet<CacheKey>>,
}

impl LruCache {
    /// Wraps `delegate`, retaining at most `capacity` entries.
    pub fn new(delegate: Arc<dyn Cache>, capacity: usize) -> Self {
        Self {
            delegate,
            capacity: capacity.max(1),
            order: Mutex::new(IndexSet::new()),
        }
    }

    fn touch(&self, key: &CacheKey) {
        let mut order = self.order.lock().expect("lru order mutex poisoned");
        order.shift_remove(key);
        order.insert(key.clone());
    }
}

impl Cache for LruCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn get(&self, key: &CacheKey) -> Option<Value> {
        let value = self.delegate.get(key)?;
        self.touch(key);
        Some(value)
    }

    fn put(&self, key: CacheKey, value: Value) {
        self.delegate.put(key.clone(), value);
        self.touch(&key);
        let evicted = {
            let mut order = self.order.lock().expect("lru order mutex poisoned");
            if order.len() > self.capacity {
                order.shift_remove_index(0)
            } else {
                None
            }
        };
        if let Some(evicted_key) = evicted {
            self.delegate.remove(&evicted_key);
        }
    }

    fn remove(&self, key: &CacheKey) -> Option<Value> {
        self.order.lock().expect("lru order mutex poisoned").shift_remove(key);
        self.delegate.remove(key)
    }

    fn clear(&self) {
        self.order.lock().expect("lru order mutex poisoned").clear();
        self.delegate.clear();
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PerpetualCache;
    use serde_json::json;

    fn key(n: i64) -> CacheKey {
        CacheKey::new("Users.selectById", 0, -1, "sql", vec![json!(n)], None)
    }

    #[test]
    fn evicts_least_recently_used_entry() {
        let cache = LruCache::new(Arc::new(PerpetualCache::new("Users")), 2);
        cache.put(key(1), json!(1));
        cache.put(key(2), json!(2));
        cache.get(&key(1)); // 1 becomes most-recently-used; 2 is now least
        cache.put(key(3), json!(3)); // evicts 2
        assert_eq!(cache.get(&key(1)), Some(json!(1)));
        assert_eq!(cache.get(&key(2)), None);
        assert_eq!(cache.get(&key(3)), Some(json!(3)));
    }
}
