//! The cache interface (§4.11): `get`/`put`/`remove`/`clear`/`size` plus an
//! identity, implemented first by a plain in-memory store and then wrapped
//! by decorators that each add one orthogonal feature.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use sqlcraft_core::value::Value;
use sqlcraft_mapping::CacheKey;

/// A second-level cache, or one layer of its decorator stack. Every method
/// takes `&self`: decorators and the base store manage their own interior
/// mutability so a `Cache` can be shared (typically behind an `Arc`) across
/// concurrently-open sessions per §5 ("second-level caches are shared
/// across sessions").
pub trait Cache: fmt::Debug + Send + Sync {
    /// The cache's identity — conventionally the owning namespace.
    fn id(&self) -> &str;

    /// Looks up `key`, returning `None` on a miss.
    fn get(&self, key: &CacheKey) -> Option<Value>;

    /// Stores `value` under `key`, replacing any existing entry.
    fn put(&self, key: CacheKey, value: Value);

    /// Removes and returns the entry under `key`, if present.
    fn remove(&self, key: &CacheKey) -> Option<Value>;

    /// Removes every entry.
    fn clear(&self);

    /// The number of entries currently stored.
    fn size(&self) -> usize;
}

/// The innermost cache: an unbounded, mutex-guarded hash map. Every
/// decorator eventually delegates down to one of these (or to a
/// caller-supplied `Cache` implementation).
#[derive(Debug)]
pub struct PerpetualCache {
    id: String,
    store: Mutex<HashMap<CacheKey, Value>>,
}

impl PerpetualCache {
    /// Creates an empty cache identified by `id` (conventionally the
    /// owning namespace).
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            store: Mutex::new(HashMap::new()),
        }
    }
}

impl Cache for PerpetualCache {
    fn id(&self) -> &str {
        &self.id
    }

    fn get(&self, key: &CacheKey) -> Option<Value> {
        self.store.lock().expect("cache mutex poisoned").get(key).cloned()
    }

    fn put(&self, key: CacheKey, value: Value) {
        self.store.lock().expect("cache mutex poisoned").insert(key, value);
    }

    fn remove(&self, key: &CacheKey) -> Option<Value> {
        self.store.lock().expect("cache mutex poisoned").remove(key)
    }

    fn clear(&self) {
        self.store.lock().expect("cache mutex poisoned").clear();
    }

    fn size(&self) -> usize {
        self.store.lock().expect("cache mutex poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(n: i64) -> CacheKey {
        CacheKey::new("Users.selectById", 0, -1, "select * from users where id = ?", vec![json!(n)], None)
    }

    #[test]
    fn put_then_get_round_trips() {
        let cache = PerpetualCache::new("Users");
        cache.put(key(1), json!({"id": 1}));
        assert_eq!(cache.get(&key(1)), Some(json!({"id": 1})));
        assert_eq!(cache.size(), 1);
    }

    #[test]
    fn remove_and_clear() {
        let cache = PerpetualCache::new("Users");
        cache.put(key(1), json!(1));
        cache.put(key(2), json!(2));
        assert_eq!(cache.remove(&key(1)), Some(json!(1)));
        assert_eq!(cache.get(&key(1)), None);
        cache.clear();
        assert_eq!(cache.size(), 0);
    }
}
