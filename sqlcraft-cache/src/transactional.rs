//! Transactional staging decorator (§4.11): buffers a session's cache writes
//! so they become visible to other sessions only on `commit`, and never on
//! `rollback`.
//!
//! Reads still consult the underlying cache (so a session sees entries other
//! sessions have already committed), but every miss is remembered so that,
//! on `commit`, entries nobody ever supplied a value for are evicted from
//! the delegate rather than left stale — this is what releases a
//! [`crate::blocking::BlockingCache`]'s per-key latch for misses this
//! session never resolved. `rollback` evicts those same missed keys for the
//! same reason, without ever touching the delegate for anything this
//! session put.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use sqlcraft_core::value::Value;
use sqlcraft_mapping::CacheKey;

use crate::cache::Cache;

struct Staging {
    entries_to_add_on_commit: HashMap<CacheKey, Value>,
    entries_missed_in_cache: HashSet<CacheKey>,
    cleared: bool,
}

impl Staging {
    fn new() -> Self {
        Self {
            entries_to_add_on_commit: HashMap::new(),
            entries_missed_in_cache: HashSet::new(),
            cleared: false,
        }
    }
}

/// One session's staging overlay on top of a shared second-level cache.
#[derive(Debug)]
pub struct TransactionalCache {
    delegate: Arc<dyn Cache>,
    staging: Mutex<Staging>,
}

impl TransactionalCache {
    /// Wraps `delegate`.
    pub fn new(delegate: Arc<dyn Cache>) -> Self {
        Self {
            delegate,
            staging: Mutex::new(Staging::new()),
        }
    }

    /// Flushes staged writes to the delegate, making them visible to other
    /// sessions. If `clear` was called mid-transaction, the delegate is
    /// cleared first. Keys that were read as misses and never staged with a
    /// value are evicted from the delegate afterward.
    pub fn commit(&self) {
        let mut staging = self.staging.lock().expect("transactional cache mutex poisoned");
        if staging.cleared {
            self.delegate.clear();
        }
        for (key, value) in staging.entries_to_add_on_commit.drain() {
            self.delegate.put(key, value);
        }
        for key in staging.entries_missed_in_cache.drain() {
            self.delegate.remove(&key);
        }
        staging.cleared = false;
    }

    /// Discards every staged write without touching the delegate for them.
    /// Keys read as misses are still evicted from the delegate, releasing
    /// any blocking latch held for them.
    pub fn rollback(&self) {
        let mut staging = self.staging.lock().expect("transactional cache mutex poisoned");
        for key in staging.entries_missed_in_cache.drain() {
            self.delegate.remove(&key);
        }
        staging.entries_to_add_on_commit.clear();
        staging.cleared = false;
    }
}

impl Cache for TransactionalCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn get(&self, key: &CacheKey) -> Option<Value> {
        let mut staging = self.staging.lock().expect("transactional cache mutex poisoned");
        if staging.cleared {
            return None;
        }
        if let Some(value) = staging.entries_to_add_on_commit.get(key) {
            return Some(value.clone());
        }
        let value = self.delegate.get(key);
        if value.is_none() {
            staging.entries_missed_in_cache.insert(key.clone());
        }
        value
    }

    fn put(&self, key: CacheKey, value: Value) {
        self.staging
            .lock()
            .expect("transactional cache mutex poisoned")
            .entries_to_add_on_commit
            .insert(key, value);
    }

    /// Removes `key` from this session's staged writes without consulting
    /// or modifying the delegate. Always returns `None`: a removal that
    /// only exists until commit has nothing meaningful to hand back.
    fn remove(&self, key: &CacheKey) -> Option<Value> {
        self.staging
            .lock()
            .expect("transactional cache mutex poisoned")
            .entries_to_add_on_commit
            .remove(key);
        None
    }

    fn clear(&self) {
        let mut staging = self.staging.lock().expect("transactional cache mutex poisoned");
        staging.entries_to_add_on_commit.clear();
        staging.cleared = true;
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
    fn staged_writes_are_invisible_to_the_delegate_until_commit() {
        let delegate = Arc::new(PerpetualCache::new("Users"));
        let session = TransactionalCache::new(delegate.clone());
        session.put(key(1), json!(1));
        assert_eq!(delegate.get(&key(1)), None);
        session.commit();
        assert_eq!(delegate.get(&key(1)), Some(json!(1)));
    }

    #[test]
    fn rollback_discards_staged_writes() {
        let delegate = Arc::new(PerpetualCache::new("Users"));
        let session = TransactionalCache::new(delegate.clone());
        session.put(key(1), json!(1));
        session.rollback();
        assert_eq!(delegate.get(&key(1)), None);
        assert_eq!(session.get(&key(1)), None);
    }

    #[test]
    fn clear_mid_transaction_wipes_delegate_on_commit() {
        let delegate = Arc::new(PerpetualCache::new("Users"));
        delegate.put(key(1), json!(1));
        let session = TransactionalCache::new(delegate.clone());
        session.clear();
        session.put(key(2), json!(2));
        session.commit();
        assert_eq!(delegate.get(&key(1)), None);
        assert_eq!(delegate.get(&key(2)), Some(json!(2)));
    }

    #[test]
    fn reads_after_clear_see_nothing_until_commit() {
        let delegate = Arc::new(PerpetualCache::new("Users"));
        delegate.put(key(1), json!(1));
        let session = TransactionalCache::new(delegate.clone());
        session.clear();
        assert_eq!(session.get(&key(1)), None);
    }
}
