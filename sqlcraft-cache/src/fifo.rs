//! FIFO eviction decorator (§4.11): bounded by insertion order, not access.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use sqlcraft_core::value::Value;
use sqlcraft_mapping::CacheKey;

use crate::cache::Cache;

/// Evicts the oldest-inserted key once `capacity` is exceeded. Unlike
/// [`crate::lru::LruCache`], reads never reorder entries.
///
/// §9 Open Questions: the source's FIFO decorator removes on eviction but
/// not on an explicit `removeObject`, leaving its key list out of sync with
/// what the delegate actually holds. This implementation mirrors every
/// `remove` onto the key list, per the spec's documented fix.
#[derive(Debug)]
pub struct FifoCache {
    delegate: Arc<dyn Cache>,
    capacity: usize,
    keys: Mutex<VecDeque<CacheKey>>,
}

impl FifoCache {
    /// Wraps `delegate`, retaining at most `capacity` entries.
    pub fn new(delegate: Arc<dyn Cache>, capacity: usize) -> Self {
        Self {
            delegate,
            capacity: capacity.max(1),
            keys: Mutex::new(VecDeque::new()),
        }
    }
}

impl Cache for FifoCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn get(&self, key: &CacheKey) -> Option<Value> {
        self.delegate.get(key)
    }

    fn put(&self, key: CacheKey, value: Value) {
        let evicted = {
            let mut keys = self.keys.lock().expect("fifo key list mutex poisoned");
            if let Some(pos) = keys.iter().position(|k| k == &key) {
                keys.remove(pos);
            }
            keys.push_back(key.clone());
            if keys.len() > self.capacity {
                keys.pop_front()
            } else {
                None
            }
        };
        self.delegate.put(key, value);
        if let Some(evicted_key) = evicted {
            self.delegate.remove(&evicted_key);
        }
    }

    fn remove(&self, key: &CacheKey) -> Option<Value> {
        let mut keys = self.keys.lock().expect("fifo key list mutex poisoned");
        if let Some(pos) = keys.iter().position(|k| k == key) {
            keys.remove(pos);
        }
        drop(keys);
        self.delegate.remove(key)
    }

    fn clear(&self) {
        self.keys.lock().expect("fifo key list mutex poisoned").clear();
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
    fn evicts_oldest_inserted_regardless_of_access() {
        let cache = FifoCache::new(Arc::new(PerpetualCache::new("Users")), 2);
        cache.put(key(1), json!(1));
        cache.put(key(2), json!(2));
        cache.get(&key(1)); // access does not protect key 1 in FIFO
        cache.put(key(3), json!(3)); // evicts 1, the oldest insertion
        assert_eq!(cache.get(&key(1)), None);
        assert_eq!(cache.get(&key(2)), Some(json!(2)));
        assert_eq!(cache.get(&key(3)), Some(json!(3)));
    }

    #[test]
    fn explicit_remove_keeps_key_list_in_sync() {
        let cache = FifoCache::new(Arc::new(PerpetualCache::new("Users")), 2);
        cache.put(key(1), json!(1));
        cache.remove(&key(1));
        cache.put(key(2), json!(2));
        cache.put(key(3), json!(3));
        // capacity 2, only 2 and 3 were ever actually resident; neither
        // should be evicted by a phantom entry for the removed key 1.
        assert_eq!(cache.get(&key(2)), Some(json!(2)));
        assert_eq!(cache.get(&key(3)), Some(json!(3)));
    }
}
