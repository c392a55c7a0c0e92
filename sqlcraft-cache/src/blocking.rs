//! Blocking decorator (§4.11): serializes concurrent misses on the same key
//! so only one caller computes a value while others wait for it, then reuse
//! the now-populated entry instead of recomputing it.
//!
//! The source holds a per-key `ReentrantLock` across the gap between `get`
//! (a miss) and the matching `put`, released explicitly once the value is
//! known. Rust's `std::sync::Mutex` has no manual unlock and no safe way to
//! hold a `MutexGuard` across two separate method calls without leaking it
//! via `mem::forget` — doing so would never run the guard's `Drop` and so
//! would permanently wedge that lock. A hand-rolled latch sidesteps this:
//! the "locked" flag and the wait queue are separate from the guard that
//! protects them, so acquiring and releasing can be two independent calls.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};

use sqlcraft_core::{Error, Result};
use sqlcraft_core::value::Value;
use sqlcraft_mapping::CacheKey;

use crate::cache::Cache;

#[derive(Default)]
struct Latch {
    locked: Mutex<bool>,
    available: Condvar,
}

impl Latch {
    fn acquire(&self) {
        let mut locked = self.locked.lock().expect("latch mutex poisoned");
        while *locked {
            locked = self.available.wait(locked).expect("latch mutex poisoned");
        }
        *locked = true;
    }

    /// Returns `false` if the latch was not held, rather than panicking, so
    /// the caller can surface an invariant violation as a `CacheError`.
    fn release(&self) -> bool {
        let mut locked = self.locked.lock().expect("latch mutex poisoned");
        if !*locked {
            return false;
        }
        *locked = false;
        self.available.notify_one();
        true
    }
}

/// Per-key latches guarding a delegate cache. A miss on `get` acquires the
/// key's latch and leaves it held; the matching `put` or an explicit
/// `release` lets the next waiter through.
pub struct BlockingCache {
    delegate: Arc<dyn Cache>,
    latches: Mutex<HashMap<CacheKey, Arc<Latch>>>,
}

impl std::fmt::Debug for BlockingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingCache").field("delegate", &self.delegate).finish()
    }
}

impl BlockingCache {
    /// Wraps `delegate`.
    pub fn new(delegate: Arc<dyn Cache>) -> Self {
        Self {
            delegate,
            latches: Mutex::new(HashMap::new()),
        }
    }

    fn latch_for(&self, key: &CacheKey) -> Arc<Latch> {
        self.latches
            .lock()
            .expect("latch table mutex poisoned")
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Latch::default()))
            .clone()
    }

    /// Releases the latch held for `key` without storing a value, e.g. when
    /// a query failed and callers should retry rather than wait forever.
    /// Errs if `key`'s latch was not currently held.
    pub fn release(&self, key: &CacheKey) -> Result<()> {
        if self.latch_for(key).release() {
            Ok(())
        } else {
            Err(Error::cache(format!("blocking cache release without a held lock for key on {}", self.delegate.id())))
        }
    }
}

impl Cache for BlockingCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn get(&self, key: &CacheKey) -> Option<Value> {
        self.latch_for(key).acquire();
        let value = self.delegate.get(key);
        if value.is_some() {
            self.latch_for(key).release();
        }
        value
    }

    fn put(&self, key: CacheKey, value: Value) {
        self.delegate.put(key.clone(), value);
        self.latch_for(&key).release();
    }

    fn remove(&self, key: &CacheKey) -> Option<Value> {
        let removed = self.delegate.remove(key);
        self.latch_for(key).release();
        removed
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

    fn key(n: i64) -> CacheKey {
        CacheKey::new("Users.selectById", 0, -1, "sql", vec![json!(n)], None)
    }

    #[test]
    fn hit_releases_immediately_and_put_releases_a_held_miss() {
        let cache = BlockingCache::new(Arc::new(PerpetualCache::new("Users")));
        assert_eq!(cache.get(&key(1)), None); // miss: latch now held
        cache.put(key(1), json!(1)); // releases the latch held by the miss
        assert_eq!(cache.get(&key(1)), Some(json!(1)));
    }

    #[test]
    fn release_without_a_held_lock_is_an_error() {
        let cache = BlockingCache::new(Arc::new(PerpetualCache::new("Users")));
        cache.get(&key(1)); // acquires and then releases is not possible on a miss alone
        assert!(cache.release(&key(1)).is_ok()); // miss left the latch held; release succeeds
        assert!(cache.release(&key(1)).is_err()); // second release has nothing to release
    }
}
