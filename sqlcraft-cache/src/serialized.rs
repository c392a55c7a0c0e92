//! Serialized decorator (§4.11): round-trips every value through a byte
//! encoding on the way in and out, so callers can never mutate a shared
//! cached value through a reference returned from a previous `get`.
//!
//! `Value` is already a plain owned `serde_json::Value` and `get`/`put`
//! already move or clone it rather than handing out a shared reference, so
//! this decorator is largely redundant here — unlike the source, where a
//! mutable object graph could otherwise be corrupted by one caller's
//! in-place edits leaking into another's. It is kept for parity with the
//! rest of the decorator stack and as a deliberate guard against a future
//! `Value` that stops being cheaply cloneable.

use std::sync::Arc;

use sqlcraft_core::value::Value;
use sqlcraft_mapping::CacheKey;

use crate::cache::Cache;

/// Wraps `delegate`, serializing values to bytes on `put` and back on `get`.
#[derive(Debug)]
pub struct SerializedCache {
    delegate: Arc<dyn Cache>,
}

impl SerializedCache {
    /// Wraps `delegate`.
    pub fn new(delegate: Arc<dyn Cache>) -> Self {
        Self { delegate }
    }
}

impl Cache for SerializedCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn get(&self, key: &CacheKey) -> Option<Value> {
        let bytes = self.delegate.get(key)?;
        let bytes = bytes.as_str()?;
        serde_json::from_str(bytes).ok()
    }

    fn put(&self, key: CacheKey, value: Value) {
        let bytes = serde_json::to_string(&value).expect("Value is always serializable");
        self.delegate.put(key, Value::String(bytes));
    }

    fn remove(&self, key: &CacheKey) -> Option<Value> {
        let bytes = self.delegate.remove(key)?;
        let bytes = bytes.as_str()?;
        serde_json::from_str(bytes).ok()
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
    fn round_trips_through_the_wire_encoding() {
        let cache = SerializedCache::new(Arc::new(PerpetualCache::new("Users")));
        let key = CacheKey::new("Users.selectById", 0, -1, "sql", vec![json!(1)], None);
        cache.put(key.clone(), json!({"id": 1, "name": "ada"}));
        assert_eq!(cache.get(&key), Some(json!({"id": 1, "name": "ada"})));
    }
}
