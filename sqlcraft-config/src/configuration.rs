//! The immutable `Configuration` aggregate (§3 "Configuration", §9
//! "Global/process-wide state"): built once by [`crate::builder::ConfigurationBuilder`],
//! then shared read-only by every runtime component as an explicit input —
//! never a singleton.

use std::sync::Arc;

use indexmap::IndexMap;

use sqlcraft_core::error::{Error, Result};
use sqlcraft_core::settings::Settings;
use sqlcraft_core::type_handler::TypeHandlerRegistry;
use sqlcraft_mapping::{MappedStatement, ResultMap};

use crate::environment::{CacheSpec, Environments};

/// A fully built, read-only configuration. Cheap to clone (an `Arc` handle
/// in all but name: every collection is wrapped so sharing it across
/// sessions never copies mapped statements or result maps).
#[derive(Debug, Clone)]
pub struct Configuration {
    inner: Arc<ConfigurationInner>,
}

#[derive(Debug)]
struct ConfigurationInner {
    settings: Settings,
    environments: Environments,
    database_id: Option<String>,
    type_handlers: TypeHandlerRegistry,
    mapped_statements: IndexMap<String, MappedStatement>,
    result_maps: IndexMap<String, ResultMap>,
    caches: IndexMap<String, CacheSpec>,
}

impl Configuration {
    pub(crate) fn new(
        settings: Settings,
        environments: Environments,
        database_id: Option<String>,
        type_handlers: TypeHandlerRegistry,
        mapped_statements: IndexMap<String, MappedStatement>,
        result_maps: IndexMap<String, ResultMap>,
        caches: IndexMap<String, CacheSpec>,
    ) -> Self {
        Self {
            inner: Arc::new(ConfigurationInner {
                settings,
                environments,
                database_id,
                type_handlers,
                mapped_statements,
                result_maps,
                caches,
            }),
        }
    }

    /// The effective settings.
    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// Configured environments.
    pub fn environments(&self) -> &Environments {
        &self.inner.environments
    }

    /// The active database id, if a provider resolved one.
    pub fn database_id(&self) -> Option<&str> {
        self.inner.database_id.as_deref()
    }

    /// The type handler registry.
    pub fn type_handlers(&self) -> &TypeHandlerRegistry {
        &self.inner.type_handlers
    }

    /// Looks up a mapped statement by its fully qualified id.
    ///
    /// §7 BindingError: "requested mapper type is unknown, or mapper method
    /// lacks a valid statement ... for the active database id" — callers
    /// that resolve a statement as part of dispatching a bound interface
    /// method should convert a `None` here into that error kind.
    pub fn mapped_statement(&self, id: &str) -> Option<&MappedStatement> {
        self.inner.mapped_statements.get(id)
    }

    /// All mapped statement ids, in registration order.
    pub fn mapped_statement_ids(&self) -> impl Iterator<Item = &str> {
        self.inner.mapped_statements.keys().map(String::as_str)
    }

    /// Looks up a result map by its fully qualified id.
    pub fn result_map(&self, id: &str) -> Option<&ResultMap> {
        self.inner.result_maps.get(id)
    }

    /// Looks up a namespace's `<cache>` declaration, if one was installed
    /// (directly or via `cache-ref`, already resolved by the builder).
    pub fn cache_spec(&self, namespace: &str) -> Option<&CacheSpec> {
        self.inner.caches.get(namespace)
    }

    /// A mapped statement, failing with `BindingError` rather than `None`.
    pub fn require_mapped_statement(&self, id: &str) -> Result<&MappedStatement> {
        self.mapped_statement(id).ok_or_else(|| Error::binding(format!("no mapped statement registered for `{id}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> Configuration {
        Configuration::new(
            Settings::default(),
            Environments::new(),
            None,
            TypeHandlerRegistry::with_builtins(),
            IndexMap::new(),
            IndexMap::new(),
            IndexMap::new(),
        )
    }

    #[test]
    fn missing_statement_is_none_but_require_fails_loudly() {
        let config = empty();
        assert!(config.mapped_statement("Users.selectById").is_none());
        assert!(config.require_mapped_statement("Users.selectById").is_err());
    }

    #[test]
    fn clone_is_cheap_and_shares_state() {
        let config = empty();
        let cloned = config.clone();
        assert!(Arc::ptr_eq(&config.inner, &cloned.inner));
    }
}
