//! Global runtime settings (§6, "Recognized settings"), parsed once at
//! configuration build time and read thereafter by every other crate.

use serde::{Deserialize, Serialize};

/// Controls how eagerly unmapped columns are auto-mapped onto result
/// properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AutoMappingBehavior {
    /// Disables auto-mapping entirely.
    None,
    /// Auto-maps only when the result has no nested result mappings.
    Partial,
    /// Always auto-maps, including nested results.
    Full,
}

impl Default for AutoMappingBehavior {
    fn default() -> Self {
        Self::Partial
    }
}

/// What to do with a column that auto-mapping can't place on the target
/// type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AutoMappingUnknownColumnBehavior {
    /// Ignore silently.
    None,
    /// Log a warning and continue.
    Warning,
    /// Fail the row mapping.
    Failing,
}

impl Default for AutoMappingUnknownColumnBehavior {
    fn default() -> Self {
        Self::None
    }
}

/// Which executor variant `openSession()` produces by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutorType {
    /// A new prepared statement per execution.
    Simple,
    /// Prepared statements reused within a session, keyed by SQL text.
    Reuse,
    /// Statements batched and flushed together.
    Batch,
}

impl Default for ExecutorType {
    fn default() -> Self {
        Self::Simple
    }
}

/// The JDBC `ResultSet` scroll sensitivity a statement requests. Carried as
/// a hint; the driver boundary this crate does not implement is free to
/// ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultSetType {
    Default,
    ForwardOnly,
    ScrollInsensitive,
    ScrollSensitive,
}

impl Default for ResultSetType {
    fn default() -> Self {
        Self::Default
    }
}

/// Scope of the first-level (session) cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LocalCacheScope {
    /// Shared for the whole session.
    Session,
    /// Cleared after each statement.
    Statement,
}

impl Default for LocalCacheScope {
    fn default() -> Self {
        Self::Session
    }
}

/// Global runtime settings, one instance per [`Configuration`]. Field names
/// mirror the setting names in §6 exactly (camelCase on the wire via
/// `serde(rename_all)`), so the XML `<settings>` block deserializes directly
/// into this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Settings {
    /// Enables the second-level cache globally. Per-namespace/per-statement
    /// caching can still be disabled independently. Default `true`.
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Enables lazy loading of nested-select associations/collections.
    /// Default `false`.
    #[serde(default)]
    pub lazy_loading_enabled: bool,

    /// When lazy loading is enabled, whether touching *any* lazy property
    /// loads *all* lazy properties of that object. Default `false`.
    #[serde(default)]
    pub aggressive_lazy_loading: bool,

    /// Whether a statement may consume more than one result set from the
    /// driver (used by `SELECT key-generation` and multi-result-set
    /// mappings). Default `true`.
    #[serde(default = "default_true")]
    pub multiple_result_sets_enabled: bool,

    /// Prefer the driver-reported column label over the column name when
    /// both are available. Default `true`.
    #[serde(default = "default_true")]
    pub use_column_label: bool,

    /// Enables retrieval of database-generated keys by default. Default
    /// `false`.
    #[serde(default)]
    pub use_generated_keys: bool,

    /// See [`AutoMappingBehavior`]. Default `Partial`.
    #[serde(default)]
    pub auto_mapping_behavior: AutoMappingBehavior,

    /// See [`AutoMappingUnknownColumnBehavior`]. Default `None`.
    #[serde(default)]
    pub auto_mapping_unknown_column_behavior: AutoMappingUnknownColumnBehavior,

    /// See [`ExecutorType`]. Default `Simple`.
    #[serde(default)]
    pub default_executor_type: ExecutorType,

    /// Default statement timeout in seconds, if any.
    #[serde(default)]
    pub default_statement_timeout: Option<u32>,

    /// Default driver fetch-size hint, if any.
    #[serde(default)]
    pub default_fetch_size: Option<u32>,

    /// See [`ResultSetType`]. Default `Default`.
    #[serde(default)]
    pub default_result_set_type: ResultSetType,

    /// Whether `RowBounds` are applied in-memory (`true`, the safe default)
    /// or pushed down and trusted to the driver (`false`). Default `false`.
    #[serde(default)]
    pub safe_row_bounds_enabled: bool,

    /// Whether a custom result handler is allowed together with nested
    /// result maps; `false` permits it. Default `true`.
    #[serde(default = "default_true")]
    pub safe_result_handler_enabled: bool,

    /// Maps `some_column` to `someColumn` automatically during auto-mapping.
    /// Default `false`.
    #[serde(default)]
    pub map_underscore_to_camel_case: bool,

    /// See [`LocalCacheScope`]. Default `Session`.
    #[serde(default)]
    pub local_cache_scope: LocalCacheScope,

    /// The jdbc type bound for parameters whose value is `null` and whose
    /// jdbc type cannot otherwise be inferred. Default `"OTHER"`.
    #[serde(default = "default_jdbc_type_for_null")]
    pub jdbc_type_for_null: String,

    /// Method names that, when called on a lazily-loaded proxy-equivalent,
    /// trigger full materialization. Default
    /// `["equals", "clone", "hashCode", "toString"]`.
    #[serde(default = "default_lazy_load_trigger_methods")]
    pub lazy_load_trigger_methods: Vec<String>,

    /// The default dynamic-SQL scripting language id, when a statement does
    /// not specify one. Default `"xml"`.
    #[serde(default = "default_scripting_language")]
    pub default_scripting_language: String,

    /// The type handler used for enum-typed results/parameters that have no
    /// explicit handler registered. Default `None` (falls back to the
    /// registry's synthesized [`crate::type_handler::EnumTypeHandler`]).
    #[serde(default)]
    pub default_enum_type_handler: Option<String>,

    /// Call setters (apply field writes) for columns whose value is `null`.
    /// Default `false`.
    #[serde(default)]
    pub call_setters_on_nulls: bool,

    /// Use the actual method parameter name (vs. `param1`, `param2`, ...)
    /// when binding unmapped method arguments. Default `true`.
    #[serde(default = "default_true")]
    pub use_actual_param_name: bool,

    /// Return an empty instance, rather than `null`/omit the row, when every
    /// column in a row mapped to the same object is `null`. Default `false`.
    #[serde(default)]
    pub return_instance_for_empty_row: bool,

    /// Collapse consecutive whitespace in rendered dynamic SQL. Default
    /// `true`.
    #[serde(default = "default_true")]
    pub shrink_whitespaces_in_sql: bool,

    /// The default SQL provider language/kind used for statements backed by
    /// a provider function rather than inline/XML SQL. Default `None`.
    #[serde(default)]
    pub default_sql_provider_type: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            lazy_loading_enabled: false,
            aggressive_lazy_loading: false,
            multiple_result_sets_enabled: true,
            use_column_label: true,
            use_generated_keys: false,
            auto_mapping_behavior: AutoMappingBehavior::default(),
            auto_mapping_unknown_column_behavior: AutoMappingUnknownColumnBehavior::default(),
            default_executor_type: ExecutorType::default(),
            default_statement_timeout: None,
            default_fetch_size: None,
            default_result_set_type: ResultSetType::default(),
            safe_row_bounds_enabled: false,
            safe_result_handler_enabled: true,
            map_underscore_to_camel_case: false,
            local_cache_scope: LocalCacheScope::default(),
            jdbc_type_for_null: default_jdbc_type_for_null(),
            lazy_load_trigger_methods: default_lazy_load_trigger_methods(),
            default_scripting_language: default_scripting_language(),
            default_enum_type_handler: None,
            call_setters_on_nulls: false,
            use_actual_param_name: true,
            return_instance_for_empty_row: false,
            shrink_whitespaces_in_sql: true,
            default_sql_provider_type: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_jdbc_type_for_null() -> String {
    "OTHER".to_string()
}

fn default_lazy_load_trigger_methods() -> Vec<String> {
    vec![
        "equals".to_string(),
        "clone".to_string(),
        "hashCode".to_string(),
        "toString".to_string(),
    ]
}

fn default_scripting_language() -> String {
    "xml".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::default();
        assert!(settings.cache_enabled);
        assert!(!settings.lazy_loading_enabled);
        assert_eq!(settings.auto_mapping_behavior, AutoMappingBehavior::Partial);
        assert_eq!(settings.default_executor_type, ExecutorType::Simple);
        assert_eq!(settings.jdbc_type_for_null, "OTHER");
        assert_eq!(
            settings.lazy_load_trigger_methods,
            vec!["equals", "clone", "hashCode", "toString"]
        );
    }

    #[test]
    fn deserializes_partial_settings_block_with_defaults() {
        let json = r#"{"cacheEnabled": false, "mapUnderscoreToCamelCase": true}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert!(!settings.cache_enabled);
        assert!(settings.map_underscore_to_camel_case);
        assert!(settings.use_column_label);
    }
}
