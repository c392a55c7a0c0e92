//! `databaseIdProvider` (§6): resolves a driver/product name to a short
//! database id used for database-id filtering of statements and fragments.

use indexmap::IndexMap;

use sqlcraft_core::error::{Error, Result};

/// The key consulted when no vendor-substring entry matches the supplied
/// product name.
const DEFAULT_KEY: &str = "_default";

/// `DB_VENDOR` database-id provider: a table of vendor product-name
/// substrings to short ids, consulted once at build time.
#[derive(Debug, Clone, Default)]
pub struct DatabaseIdProvider {
    vendor_to_id: IndexMap<String, String>,
}

impl DatabaseIdProvider {
    /// Builds a provider from the `<databaseIdProvider type="DB_VENDOR">`
    /// property map (vendor-substring → id, plus an optional `_default`
    /// fallback).
    pub fn db_vendor(properties: IndexMap<String, String>) -> Self {
        Self { vendor_to_id: properties }
    }

    /// Resolves `product_name` (e.g. a JDBC `DatabaseMetaData.getDatabaseProductName()`
    /// equivalent) to a database id: the first vendor-substring entry whose
    /// key appears in `product_name` (case-insensitive), else `_default` if
    /// present, else `None`.
    pub fn resolve(&self, product_name: &str) -> Option<String> {
        let haystack = product_name.to_ascii_lowercase();
        for (vendor, id) in &self.vendor_to_id {
            if vendor == DEFAULT_KEY {
                continue;
            }
            if haystack.contains(&vendor.to_ascii_lowercase()) {
                return Some(id.clone());
            }
        }
        self.vendor_to_id.get(DEFAULT_KEY).cloned()
    }

    /// Resolves `product_name`, failing loudly when nothing matches and no
    /// `_default` fallback is configured.
    pub fn resolve_or_fail(&self, product_name: &str) -> Result<String> {
        self.resolve(product_name)
            .ok_or_else(|| Error::build(format!("no databaseId matches product name `{product_name}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> DatabaseIdProvider {
        let mut props = IndexMap::new();
        props.insert("MySQL".to_string(), "mysql".to_string());
        props.insert("PostgreSQL".to_string(), "postgres".to_string());
        props.insert(DEFAULT_KEY.to_string(), "generic".to_string());
        DatabaseIdProvider::db_vendor(props)
    }

    #[test]
    fn matches_vendor_substring_case_insensitively() {
        assert_eq!(provider().resolve("mysql community server"), Some("mysql".to_string()));
    }

    #[test]
    fn falls_back_to_default() {
        assert_eq!(provider().resolve("SQLite"), Some("generic".to_string()));
    }

    #[test]
    fn no_default_yields_none() {
        let provider = DatabaseIdProvider::db_vendor(IndexMap::new());
        assert_eq!(provider.resolve("anything"), None);
    }
}
