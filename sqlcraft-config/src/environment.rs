//! `environments@default` (§6): named transaction-manager/data-source pairs,
//! one of which is active.

use indexmap::IndexMap;

/// A pluggable component's type name plus its raw property bag
/// (`transactionManager`, `dataSource`, `objectFactory`,
/// `objectWrapperFactory`, `reflectorFactory` all share this shape). The
/// concrete driver/transaction behavior behind `kind` is out of this
/// crate's scope; `sqlcraft-exec` resolves it against its own registry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PluggableSpec {
    /// The configured component type, e.g. `"JDBC"`, `"POOLED"`.
    pub kind: String,
    /// Raw `<property name= value=>` entries, in declaration order.
    pub properties: IndexMap<String, String>,
}

impl PluggableSpec {
    /// Creates a spec with no properties.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            properties: IndexMap::new(),
        }
    }
}

/// One `<environment>` entry: a transaction manager and data source pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// The environment id.
    pub id: String,
    /// The transaction manager spec.
    pub transaction_manager: PluggableSpec,
    /// The data source spec.
    pub data_source: PluggableSpec,
}

/// All configured environments plus which one is active.
#[derive(Debug, Clone, Default)]
pub struct Environments {
    /// The id of the active environment, if configured.
    pub default: Option<String>,
    /// All configured environments, in declaration order.
    pub list: IndexMap<String, Environment>,
}

impl Environments {
    /// Creates an empty environment registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The active environment, if `default` names one that exists.
    pub fn active(&self) -> Option<&Environment> {
        self.default.as_ref().and_then(|id| self.list.get(id))
    }
}

/// A `<cache>` element's configuration: eviction policy, sizing, and
/// read-only/blocking flags. The actual `Cache` trait object is assembled
/// by `sqlcraft-cache` from this spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSpec {
    /// Eviction policy: `"LRU"`, `"FIFO"`, `"SOFT"`, `"WEAK"`, or a custom
    /// type name. Defaults to `"LRU"` when the `<cache>` element omits
    /// `eviction`, matching the teacher convention of a permissive default.
    pub eviction: String,
    /// Periodic full-clear interval in milliseconds, if configured
    /// (`scheduled` decorator).
    pub flush_interval: Option<u64>,
    /// Bounded size, if configured (`LRU`/`FIFO` decorators).
    pub size: Option<u32>,
    /// Whether reads return shared references without copying
    /// (`false` wraps with the `serialized` decorator).
    pub read_only: bool,
    /// Whether misses block concurrent readers until the first populates
    /// the entry (`blocking` decorator).
    pub blocking: bool,
    /// Raw `<property name= value=>` entries.
    pub properties: IndexMap<String, String>,
}

impl Default for CacheSpec {
    fn default() -> Self {
        Self {
            eviction: "LRU".to_string(),
            flush_interval: None,
            size: None,
            read_only: false,
            blocking: false,
            properties: IndexMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_environment_resolves_by_default_id() {
        let mut environments = Environments::new();
        environments.list.insert(
            "dev".to_string(),
            Environment {
                id: "dev".to_string(),
                transaction_manager: PluggableSpec::new("JDBC"),
                data_source: PluggableSpec::new("POOLED"),
            },
        );
        environments.default = Some("dev".to_string());
        assert_eq!(environments.active().unwrap().id, "dev");
    }

    #[test]
    fn cache_spec_defaults_to_lru() {
        assert_eq!(CacheSpec::default().eviction, "LRU");
    }
}
