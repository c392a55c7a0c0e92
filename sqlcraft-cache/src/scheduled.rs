//! Scheduled full-clear decorator (§4.11): a time-boxed cache with no
//! implicit background threads (§5). The clear interval is enforced lazily,
//! checked against the clock on every call rather than by a timer task.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use sqlcraft_core::value::Value;
use sqlcraft_mapping::CacheKey;

use crate::cache::Cache;

/// Wraps a delegate, clearing it entirely once `interval` has elapsed since
/// the last clear (or since construction).
#[derive(Debug)]
pub struct ScheduledCache {
    delegate: Arc<dyn Cache>,
    interval: Duration,
    last_clear: Mutex<Instant>,
}

impl ScheduledCache {
    /// Wraps `delegate`, fully clearing it every `interval`.
    pub fn new(delegate: Arc<dyn Cache>, interval: Duration) -> Self {
        Self {
            delegate,
            interval,
            last_clear: Mutex::new(Instant::now()),
        }
    }

    fn clear_if_due(&self) {
        let mut last_clear = self.last_clear.lock().expect("schedule mutex poisoned");
        if last_clear.elapsed() >= self.interval {
            self.delegate.clear();
            *last_clear = Instant::now();
        }
    }
}

impl Cache for ScheduledCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn get(&self, key: &CacheKey) -> Option<Value> {
        self.clear_if_due();
        self.delegate.get(key)
    }

    fn put(&self, key: CacheKey, value: Value) {
        self.clear_if_due();
        self.delegate.put(key, value);
    }

    fn remove(&self, key: &CacheKey) -> Option<Value> {
        self.clear_if_due();
        self.delegate.remove(key)
    }

    fn clear(&self) {
        self.delegate.clear();
        *self.last_clear.lock().expect("schedule mutex poisoned") = Instant::now();
    }

    fn size(&self) -> usize {
        self.clear_if_due();
        self.delegate.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PerpetualCache;
    use serde_json::json;
    use std::thread::sleep;

    fn key(n: i64) -> CacheKey {
        CacheKey::new("Users.selectById", 0, -1, "sql", vec![json!(n)], None)
    }

    #[test]
    fn clears_once_interval_elapses() {
        let cache = ScheduledCache::new(Arc::new(PerpetualCache::new("Users")), Duration::from_millis(10));
        cache.put(key(1), json!(1));
        assert_eq!(cache.get(&key(1)), Some(json!(1)));
        sleep(Duration::from_millis(20));
        assert_eq!(cache.get(&key(1)), None);
    }

    #[test]
    fn does_not_clear_before_interval_elapses() {
        let cache = ScheduledCache::new(Arc::new(PerpetualCache::new("Users")), Duration::from_secs(60));
        cache.put(key(1), json!(1));
        assert_eq!(cache.get(&key(1)), Some(json!(1)));
    }
}
