//! Soft/weak reference decorators (§4.11), adapted for a runtime without
//! garbage-collector-tracked reference strength.
//!
//! The source relies on `SoftReference`/`WeakReference` plus GC pressure to
//! decide when an entry becomes eligible for reclamation. Rust has no
//! equivalent: there is no collector to apply pressure to. This module
//! models the same *shape* of behavior — a bounded pool of entries stays
//! strongly reachable, older entries are reclaimed deterministically once
//! they fall out of that pool — as a capped recency queue rather than
//! anything GC-driven.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use sqlcraft_core::value::Value;
use sqlcraft_mapping::CacheKey;

use crate::cache::Cache;

/// Retains the `retained` most-recently-put entries; everything older is
/// dropped from the delegate as though collected.
#[derive(Debug)]
pub(crate) struct RetentionCache {
    delegate: Arc<dyn Cache>,
    retained: usize,
    queue: Mutex<VecDeque<CacheKey>>,
}

impl RetentionCache {
    pub(crate) fn new(delegate: Arc<dyn Cache>, retained: usize) -> Self {
        Self {
            delegate,
            retained,
            queue: Mutex::new(VecDeque::new()),
        }
    }

    fn retain(&self, key: CacheKey) {
        if self.retained == 0 {
            return;
        }
        let reclaimed = {
            let mut queue = self.queue.lock().expect("retention queue mutex poisoned");
            if let Some(pos) = queue.iter().position(|k| k == &key) {
                queue.remove(pos);
            }
            queue.push_back(key);
            if queue.len() > self.retained {
                queue.pop_front()
            } else {
                None
            }
        };
        if let Some(reclaimed_key) = reclaimed {
            self.delegate.remove(&reclaimed_key);
        }
    }
}

impl Cache for RetentionCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn get(&self, key: &CacheKey) -> Option<Value> {
        self.delegate.get(key)
    }

    fn put(&self, key: CacheKey, value: Value) {
        self.delegate.put(key.clone(), value);
        self.retain(key);
    }

    fn remove(&self, key: &CacheKey) -> Option<Value> {
        self.queue.lock().expect("retention queue mutex poisoned").retain(|k| k != key);
        self.delegate.remove(key)
    }

    fn clear(&self) {
        self.queue.lock().expect("retention queue mutex poisoned").clear();
        self.delegate.clear();
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }
}

/// Soft-reference-flavored decorator: holds a generous number of entries
/// strongly reachable (mirroring the source's `numberOfHardLinks = 256`
/// default) before the oldest falls out.
#[derive(Debug)]
pub struct SoftCache {
    inner: RetentionCache,
}

impl SoftCache {
    /// Retains the last 256 entries by default, matching the source constant.
    pub fn new(delegate: Arc<dyn Cache>) -> Self {
        Self::with_retention(delegate, 256)
    }

    /// Retains the last `retained` entries.
    pub fn with_retention(delegate: Arc<dyn Cache>, retained: usize) -> Self {
        Self {
            inner: RetentionCache::new(delegate, retained),
        }
    }
}

impl Cache for SoftCache {
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
    fn reclaims_oldest_once_retention_window_is_exceeded() {
        let cache = SoftCache::with_retention(Arc::new(PerpetualCache::new("Users")), 2);
        cache.put(key(1), json!(1));
        cache.put(key(2), json!(2));
        cache.put(key(3), json!(3));
        assert_eq!(cache.get(&key(1)), None);
        assert_eq!(cache.get(&key(2)), Some(json!(2)));
        assert_eq!(cache.get(&key(3)), Some(json!(3)));
    }
}
