//! Logging decorator (§4.11): tracks hit/miss counts and reports the running
//! hit ratio through `tracing`, for diagnosing an underperforming
//! second-level cache.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sqlcraft_core::value::Value;
use sqlcraft_mapping::CacheKey;

use crate::cache::Cache;

/// Wraps `delegate`, counting hits and misses and logging the ratio on
/// every `get`.
#[derive(Debug)]
pub struct LoggingCache {
    delegate: Arc<dyn Cache>,
    hits: AtomicU64,
    requests: AtomicU64,
}

impl LoggingCache {
    /// Wraps `delegate`.
    pub fn new(delegate: Arc<dyn Cache>) -> Self {
        Self {
            delegate,
            hits: AtomicU64::new(0),
            requests: AtomicU64::new(0),
        }
    }

    /// The running hit ratio, or `0.0` before any request has been made.
    pub fn hit_ratio(&self) -> f64 {
        let requests = self.requests.load(Ordering::Relaxed);
        if requests == 0 {
            0.0
        } else {
            self.hits.load(Ordering::Relaxed) as f64 / requests as f64
        }
    }
}

impl Cache for LoggingCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn get(&self, key: &CacheKey) -> Option<Value> {
        let requests = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
        let value = self.delegate.get(key);
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        tracing::debug!(cache = self.delegate.id(), hit_ratio = self.hit_ratio(), requests, "cache lookup");
        value
    }

    fn put(&self, key: CacheKey, value: Value) {
        self.delegate.put(key, value);
    }

    fn remove(&self, key: &CacheKey) -> Option<Value> {
        self.delegate.remove(key)
    }

    fn clear(&self) {
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

    #[test]
    fn tracks_hit_ratio_across_hits_and_misses() {
        let cache = LoggingCache::new(Arc::new(PerpetualCache::new("Users")));
        let key = CacheKey::new("Users.selectById", 0, -1, "sql", vec![json!(1)], None);
        cache.get(&key); // miss
        cache.put(key.clone(), json!(1));
        cache.get(&key); // hit
        cache.get(&key); // hit
        assert!((cache.hit_ratio() - (2.0 / 3.0)).abs() < 1e-9);
    }
}
