//! Small closed enums shared by [`crate::mapped_statement::MappedStatement`]
//! and [`crate::result_map::ResultMapping`].

use serde::{Deserialize, Serialize};

/// The kind of SQL operation a mapped statement performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommandType {
    Select,
    Insert,
    Update,
    Delete,
}

/// Which statement handler executes a mapped statement (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatementType {
    /// Binds parameters through positional placeholders (the default).
    Prepared,
    /// Substitutes parameters directly into the SQL text; only valid when
    /// the compiled SQL carries no parameter mappings.
    Simple,
    /// Binds IN/OUT/INOUT parameters and may return OUT cursor results.
    Callable,
}

impl Default for StatementType {
    fn default() -> Self {
        Self::Prepared
    }
}

/// Parameter direction for a [`crate::parameter_mapping::ParameterMapping`],
/// relevant to `Callable` statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParameterMode {
    In,
    Out,
    InOut,
}

impl Default for ParameterMode {
    fn default() -> Self {
        Self::In
    }
}

/// When a nested association/collection is resolved relative to its parent
/// row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FetchType {
    /// Defers to the global `lazyLoadingEnabled` setting.
    Default,
    Lazy,
    Eager,
}

impl Default for FetchType {
    fn default() -> Self {
        Self::Default
    }
}

/// How a mapped statement's generated keys are produced (§4.8 "Key
/// generation").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyGenerator {
    /// No key generation is performed.
    NoKeyGenerator,
    /// Driver-returned generated keys, read back after execution and
    /// written into `key_property`/`key_column`.
    Jdbc3,
    /// An explicit select-key statement, executed before or after the
    /// primary insert, whose single-row/single-column result is written
    /// into the parameter object's `key_property`.
    SelectKey {
        /// The statement id of the select-key query.
        statement_id: String,
        /// Whether it runs before or after the primary statement.
        order: SelectKeyOrder,
    },
}

/// Execution order of a [`KeyGenerator::SelectKey`] relative to the primary
/// statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SelectKeyOrder {
    Before,
    After,
}
