//! `MappedStatement` (§3): the compiled, immutable definition of one SQL
//! operation.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use sqlcraft_core::error::Result;
use sqlcraft_core::value::Value;

use crate::bound_sql::BoundSql;
use crate::command::{CommandType, KeyGenerator, StatementType};

/// Renders a statement's SQL source into a [`BoundSql`] for one invocation.
///
/// Two implementations exist, per §4.6: a **Raw** source (no dynamic nodes:
/// renders once at build time, then replays its cached SQL/mappings) and a
/// **Dynamic** source (walks a compiled node tree fresh for every call).
/// Both live in `sqlcraft-dynamic`, which depends on this crate for
/// [`BoundSql`]/`ParameterMapping`; modeling the relationship as a trait
/// object here (rather than an enum holding the node tree inline) avoids a
/// dependency cycle back from this crate to `sqlcraft-dynamic`.
pub trait SqlSource: fmt::Debug + Send + Sync {
    /// Renders this source against `parameter_object`, producing the final
    /// SQL and its ordered parameter mappings.
    fn bound_sql(&self, parameter_object: &Value) -> Result<BoundSql>;
}

/// Identifies one mapped statement, unique within a `Configuration`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatementId(pub String);

impl StatementId {
    /// Builds `"{namespace}.{method_name}"`.
    pub fn new(namespace: impl AsRef<str>, method_name: impl AsRef<str>) -> Self {
        Self(format!("{}.{}", namespace.as_ref(), method_name.as_ref()))
    }
}

impl std::fmt::Display for StatementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The compiled, immutable definition of one SQL operation (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappedStatement {
    /// `"{namespace}.{methodName}"`, unique within a `Configuration`.
    pub id: StatementId,
    /// SELECT/INSERT/UPDATE/DELETE.
    pub command_type: CommandType,
    /// PREPARED/SIMPLE/CALLABLE.
    pub statement_type: StatementType,
    /// The compiled SQL source.
    #[serde(skip)]
    pub sql_source: Option<Arc<dyn SqlSource>>,
    /// The parameter type tag, if declared (used for attribute-resolution
    /// hints only; binding itself is structural over the parameter value).
    pub parameter_type: Option<String>,
    /// The declared result type, for statements that map directly to a
    /// scalar/bean type rather than through a named result map.
    pub result_type: Option<String>,
    /// Named result maps this statement projects through, in declaration
    /// order (more than one supports `resultSets` / multiple result sets).
    pub result_map_ids: Vec<String>,
    /// Driver fetch-size hint, overriding the global default.
    pub fetch_size: Option<u32>,
    /// Statement timeout in seconds, overriding the global default.
    pub timeout: Option<u32>,
    /// Clears the statement's declared cache (if any) before execution.
    pub flush_cache: bool,
    /// Whether this statement may read from the second-level cache.
    pub use_cache: bool,
    /// How generated keys (if any) are produced and written back.
    pub key_generator: KeyGenerator,
    /// The parameter object property receiving a generated key.
    pub key_property: Option<String>,
    /// The driver-reported column name for a generated key.
    pub key_column: Option<String>,
    /// Restricts this statement to a specific `databaseId`; `None` matches
    /// any (as a fallback behind a more specific match).
    pub database_id: Option<String>,
    /// The scripting dialect that compiled `sql_source` (reserved for
    /// non-default scripting languages; always `"xml"` today).
    pub lang: String,
    /// Names for consuming multiple result sets returned by one execution,
    /// aligned positionally with `result_map_ids`.
    pub result_sets: Vec<String>,
}

impl MappedStatement {
    /// Returns true if `flush_cache` defaults make sense for `command_type`:
    /// MyBatis-style runtimes default `flushCache` to `true` for writes and
    /// `false` for selects, and `useCache` to `true` only for selects.
    pub fn default_cache_flags(command_type: CommandType) -> (bool, bool) {
        match command_type {
            CommandType::Select => (false, true),
            _ => (true, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_id_format() {
        let id = StatementId::new("com.example.UserMapper", "selectById");
        assert_eq!(id.to_string(), "com.example.UserMapper.selectById");
    }

    #[test]
    fn default_cache_flags_match_command_type() {
        assert_eq!(MappedStatement::default_cache_flags(CommandType::Select), (false, true));
        assert_eq!(MappedStatement::default_cache_flags(CommandType::Insert), (true, false));
    }
}
