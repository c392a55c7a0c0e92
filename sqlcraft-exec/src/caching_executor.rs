//! The caching executor decorator (§4.8, §4.11): wraps any [`Executor`]
//! delegate with the second-level cache. Each namespace with a `<cache>`
//! declaration gets one shared decorator stack (built once, by
//! [`SecondLevelCaches::build`]) and one per-session [`TransactionalCache`]
//! staging overlay on top of it, so writes in an uncommitted session never
//! become visible to other sessions sharing the same second-level cache.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use sqlcraft_cache::{
    BlockingCache, Cache, FifoCache, LoggingCache, LruCache, PerpetualCache, ScheduledCache, SerializedCache, SoftCache, SynchronizedCache, TransactionalCache, WeakCache,
};
use sqlcraft_config::{CacheSpec, Configuration};
use sqlcraft_core::error::Result;
use sqlcraft_mapping::{CacheKey, MappedStatement};

use crate::connection::UpdateResult;
use crate::executor::{Executor, RowBounds};

/// Assembles the decorator stack described by `spec`, identified by
/// `namespace`. Order: eviction policy (innermost, over the base store),
/// scheduled clearing, blocking, serialized (unless read-only), then
/// synchronized and logging (outermost), matching §4.11's composition.
pub fn build_second_level_cache(spec: &CacheSpec, namespace: &str) -> Arc<dyn Cache> {
    let base: Arc<dyn Cache> = Arc::new(PerpetualCache::new(namespace));
    let mut cache: Arc<dyn Cache> = match spec.eviction.to_ascii_uppercase().as_str() {
        "FIFO" => Arc::new(FifoCache::new(base, spec.size.unwrap_or(1024) as usize)),
        "SOFT" => Arc::new(SoftCache::new(base)),
        "WEAK" => Arc::new(WeakCache::new(base)),
        _ => Arc::new(LruCache::new(base, spec.size.unwrap_or(1024) as usize)),
    };
    if let Some(interval) = spec.flush_interval {
        cache = Arc::new(ScheduledCache::new(cache, std::time::Duration::from_millis(interval)));
    }
    if spec.blocking {
        cache = Arc::new(BlockingCache::new(cache));
    }
    if !spec.read_only {
        cache = Arc::new(SerializedCache::new(cache));
    }
    cache = Arc::new(SynchronizedCache::new(cache));
    Arc::new(LoggingCache::new(cache))
}

/// The shared second-level cache registry: one entry per namespace that
/// declares a `<cache>`, built once and shared (via `Arc`) by every
/// session's [`CachingExecutor`].
#[derive(Debug, Default, Clone)]
pub struct SecondLevelCaches {
    by_namespace: HashMap<String, Arc<dyn Cache>>,
}

impl SecondLevelCaches {
    /// Builds one decorator stack per namespace with a `<cache>`
    /// declaration, discovered from `configuration`'s mapped statement ids
    /// (`"{namespace}.{method}"`).
    pub fn build(configuration: &Configuration) -> Self {
        let mut namespaces: Vec<&str> = configuration
            .mapped_statement_ids()
            .filter_map(|id| id.rsplit_once('.').map(|(namespace, _)| namespace))
            .collect();
        namespaces.sort_unstable();
        namespaces.dedup();

        let mut by_namespace = HashMap::new();
        for namespace in namespaces {
            if let Some(spec) = configuration.cache_spec(namespace) {
                by_namespace.insert(namespace.to_string(), build_second_level_cache(spec, namespace));
            }
        }
        Self { by_namespace }
    }

    fn get(&self, namespace: &str) -> Option<Arc<dyn Cache>> {
        self.by_namespace.get(namespace).cloned()
    }
}

/// Decorates an [`Executor`] with second-level cache reads/writes.
/// Statements opt in via `use_cache`/`flush_cache`; a statement whose
/// namespace has no `<cache>` declaration passes straight through.
#[derive(Debug)]
pub struct CachingExecutor<E: Executor> {
    delegate: E,
    second_level: SecondLevelCaches,
    sessions: HashMap<String, Arc<TransactionalCache>>,
    environment: Option<String>,
}

impl<E: Executor> CachingExecutor<E> {
    /// Wraps `delegate`, sharing `second_level`'s decorator stacks across
    /// whatever other sessions were built from the same registry.
    pub fn new(delegate: E, second_level: SecondLevelCaches, environment: Option<String>) -> Self {
        Self {
            delegate,
            second_level,
            sessions: HashMap::new(),
            environment,
        }
    }

    fn staging_for(&mut self, namespace: &str) -> Option<Arc<TransactionalCache>> {
        if let Some(existing) = self.sessions.get(namespace) {
            return Some(existing.clone());
        }
        let shared = self.second_level.get(namespace)?;
        let staging = Arc::new(TransactionalCache::new(shared));
        self.sessions.insert(namespace.to_string(), staging.clone());
        Some(staging)
    }

    fn namespace_of(statement: &MappedStatement) -> String {
        statement.id.to_string().rsplit_once('.').map(|(namespace, _)| namespace.to_string()).unwrap_or_default()
    }
}

impl<E: Executor> Executor for CachingExecutor<E> {
    fn query(&mut self, statement: &MappedStatement, parameter: Value, bounds: RowBounds, result_map_id: &str) -> Result<Vec<Value>> {
        if !statement.use_cache {
            return self.delegate.query(statement, parameter, bounds, result_map_id);
        }
        let namespace = Self::namespace_of(statement);
        let Some(staging) = self.staging_for(&namespace) else {
            return self.delegate.query(statement, parameter, bounds, result_map_id);
        };

        if statement.flush_cache {
            staging.clear();
        }

        let cache_key = CacheKey::new(statement.id.to_string(), bounds.offset, bounds.limit, result_map_id, vec![parameter.clone()], self.environment.clone());
        if let Some(cached) = staging.get(&cache_key) {
            return Ok(cached.as_array().cloned().unwrap_or_default());
        }

        let rows = self.delegate.query(statement, parameter, bounds, result_map_id)?;
        staging.put(cache_key, Value::Array(rows.clone()));
        Ok(rows)
    }

    fn query_multi(&mut self, statement: &MappedStatement, parameter: Value) -> Result<Vec<Value>> {
        self.delegate.query_multi(statement, parameter)
    }

    fn update(&mut self, statement: &MappedStatement, parameter: &mut Value) -> Result<UpdateResult> {
        let namespace = Self::namespace_of(statement);
        if statement.flush_cache {
            if let Some(staging) = self.staging_for(&namespace) {
                staging.clear();
            }
        }
        self.delegate.update(statement, parameter)
    }

    fn commit(&mut self) -> Result<()> {
        self.delegate.commit()?;
        for staging in self.sessions.values() {
            staging.commit();
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        let delegate_result = self.delegate.rollback();
        for staging in self.sessions.values() {
            staging.rollback();
        }
        delegate_result
    }

    fn close(&mut self) {
        self.delegate.close();
        for staging in self.sessions.values() {
            staging.rollback();
        }
    }

    fn clear_local_cache(&mut self) {
        self.delegate.clear_local_cache();
    }
}
