//! Weak-reference-flavored decorator (§4.11). See [`crate::soft`] for the
//! rationale behind modeling reference-strength decorators as a
//! deterministic retention queue rather than anything GC-driven.

use std::sync::Arc;

use sqlcraft_core::value::Value;
use sqlcraft_mapping::CacheKey;

use crate::cache::Cache;
use crate::soft::RetentionCache;

/// Weak-reference-flavored decorator: entries fall out almost immediately,
/// mirroring the source's much smaller hard-link count for weak references.
#[derive(Debug)]
pub struct WeakCache {
    inner: RetentionCache,
}

impl WeakCache {
    /// Retains only the single most recently put entry by default.
    pub fn new(delegate: Arc<dyn Cache>) -> Self {
        Self::with_retention(delegate, 1)
    }

    /// Retains the last `retained` entries.
    pub fn with_retention(delegate: Arc<dyn Cache>, retained: usize) -> Self {
        Self {
            inner: RetentionCache::new(delegate, retained),
        }
    }
}

impl Cache for WeakCache {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn get(&self, key: &CacheKey) -> Option<Value> {
        self.inner.get(key)
    }

    fn put(&self, key: CacheKey, value: Value) {
        self.inner.put(key, value);
    }

    fn remove(&self, key: &CacheKey) -> Option<Value> {
        self.inner.remove(key)
    }

    fn clear(&self) {
        self.inner.clear();
    }

    fn size(&self) -> usize {
        self.inner.size()
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
    fn only_the_most_recent_put_survives() {
        let cache = WeakCache::new(Arc::new(PerpetualCache::new("Users")));
        cache.put(key(1), json!(1));
        cache.put(key(2), json!(2));
        assert_eq!(cache.get(&key(1)), None);
        assert_eq!(cache.get(&key(2)), Some(json!(2)));
    }
}
