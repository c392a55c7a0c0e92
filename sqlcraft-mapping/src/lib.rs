//! # sqlcraft-mapping
//!
//! Immutable mapping definitions: `MappedStatement`, `ResultMap`,
//! `ParameterMapping`, `BoundSql`, `CacheKey`. These are pure data (plus the
//! small `SqlSource` trait bridging to `sqlcraft-dynamic`'s renderers) with
//! no execution behavior of their own.

#![deny(missing_docs)]
#![deny(unused_imports)]

/// `BoundSql`: the per-invocation SQL + bindings render of a statement.
pub mod bound_sql;
/// `CacheKey`: composite cache equality key.
pub mod cache_key;
/// Small closed enums (`CommandType`, `StatementType`, `KeyGenerator`, ...).
pub mod command;
/// `MappedStatement` and the `SqlSource` rendering trait.
pub mod mapped_statement;
/// `ParameterMapping`: one resolved `#{...}` binding.
pub mod parameter_mapping;
/// `ResultMap`/`ResultMapping`/`Discriminator`.
pub mod result_map;

pub use bound_sql::BoundSql;
pub use cache_key::CacheKey;
pub use command::{CommandType, FetchType, KeyGenerator, ParameterMode, SelectKeyOrder, StatementType};
pub use mapped_statement::{MappedStatement, SqlSource, StatementId};
pub use parameter_mapping::ParameterMapping;
pub use result_map::{Discriminator, ResultMap, ResultMapping, ResultMappingFlags};
