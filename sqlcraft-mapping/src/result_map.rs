//! `ResultMap` / `ResultMapping` / `Discriminator` (§3): the declarative
//! projection from result columns to a target type.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use sqlcraft_core::error::{Error, Result};
use sqlcraft_core::type_handler::{JdbcType, ValueKind};

use crate::command::FetchType;

/// One column (or constructor-arg) projection within a [`ResultMap`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMapping {
    /// The target property name, or — for `flags.constructor` mappings —
    /// the constructor argument name.
    pub property: String,
    /// The source column name (absent for mappings that only exist to host
    /// a nested select/result map keyed by a foreign column).
    pub column: Option<String>,
    /// Explicit value kind, overriding inference from the target type.
    pub value_kind: Option<ValueKind>,
    /// Explicit jdbc type.
    pub jdbc_type: Option<JdbcType>,
    /// An explicitly named type handler.
    pub type_handler: Option<String>,
    /// Mapping flags (`id`, `constructor`).
    pub flags: ResultMappingFlags,
    /// A nested select statement id: this property is a lazy/eager
    /// association resolved by running another mapped statement, keyed by
    /// `column` (or `foreign_column`/`foreign_columns` below).
    pub nested_select: Option<String>,
    /// A nested result map id: this property is resolved eagerly from
    /// columns of the *same* row (a join), recursing into another
    /// `ResultMap`.
    pub nested_result_map: Option<String>,
    /// Columns on the parent row passed as parameters to `nested_select`,
    /// as `foreign_column_name -> nested_select_param_name` pairs. A single
    /// unqualified foreign column is stored under the empty key.
    pub foreign_columns: IndexMap<String, String>,
    /// Columns that must all be non-null for this association/collection to
    /// be considered present.
    pub not_null_columns: Vec<String>,
    /// Prefix stripped from column names before resolving a nested result
    /// map's own column references.
    pub column_prefix: Option<String>,
    /// Eager/lazy/default fetch behavior, overriding `lazyLoadingEnabled`.
    pub fetch_type: FetchType,
    /// The collection element type tag, when this mapping projects a
    /// collection rather than a scalar association.
    pub of_type: Option<String>,
    /// Names the result set (by position in `MappedStatement::result_sets`)
    /// this mapping is populated from, when a statement returns more than
    /// one result set (§4.10 "multiple result sets"). `None` for mappings
    /// resolved from the same row as their parent.
    pub result_set: Option<String>,
}

/// Flags on a [`ResultMapping`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMappingFlags {
    /// Marks this column as (part of) the row's identity, used to detect
    /// repeated parent rows when collapsing one-to-many joins.
    pub id: bool,
    /// This mapping is a constructor argument rather than a field/setter
    /// target.
    pub constructor: bool,
}

impl ResultMapping {
    /// A plain `column -> property` mapping with no flags or nesting.
    pub fn simple(property: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            column: Some(column.into()),
            value_kind: None,
            jdbc_type: None,
            type_handler: None,
            flags: ResultMappingFlags::default(),
            nested_select: None,
            nested_result_map: None,
            foreign_columns: IndexMap::new(),
            not_null_columns: Vec::new(),
            column_prefix: None,
            fetch_type: FetchType::default(),
            of_type: None,
            result_set: None,
        }
    }

    /// True if this mapping is an association/collection resolved via
    /// either a nested select or a nested result map.
    pub fn is_nested(&self) -> bool {
        self.nested_select.is_some() || self.nested_result_map.is_some()
    }

    /// Validates the "at most one of `nested_select`/`nested_result_map`"
    /// invariant (§3).
    pub fn validate(&self) -> Result<()> {
        if self.nested_select.is_some() && self.nested_result_map.is_some() {
            return Err(Error::build(format!(
                "result mapping for `{}` declares both a nested select and a nested result map",
                self.property
            )));
        }
        Ok(())
    }
}

/// A column-value-driven sub-result-map dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discriminator {
    /// The column whose value selects a case.
    pub column: String,
    /// Explicit jdbc type for reading the discriminator column.
    pub jdbc_type: Option<JdbcType>,
    /// Stringified column value -> nested result map id. Disjoint by
    /// construction (a `HashMap`-backed key can only be inserted once; a
    /// duplicate case is rejected at build time, see
    /// [`Discriminator::with_case`]).
    pub cases: IndexMap<String, String>,
}

impl Discriminator {
    /// Creates a discriminator with no cases.
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            jdbc_type: None,
            cases: IndexMap::new(),
        }
    }

    /// Adds one case, rejecting a duplicate value per the "disjoint map"
    /// invariant (§3).
    pub fn with_case(mut self, value: impl Into<String>, result_map_id: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if self.cases.contains_key(&value) {
            return Err(Error::build(format!(
                "discriminator on column `{}` has a duplicate case `{}`",
                self.column, value
            )));
        }
        self.cases.insert(value, result_map_id.into());
        Ok(self)
    }
}

/// An immutable declarative projection from result columns to a target
/// type (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMap {
    /// The fully-qualified id, unique within a `Configuration`.
    pub id: String,
    /// The target type tag (a logical name, since this crate has no access
    /// to the consumer's Rust types).
    pub target_type: String,
    /// Another result map this one extends: its mappings are prepended,
    /// with this map's own mappings able to shadow by `property`.
    pub extends: Option<String>,
    /// Whether unmapped columns are auto-mapped onto same-named properties,
    /// overriding the global `autoMappingBehavior` setting.
    pub auto_mapping: Option<bool>,
    /// Optional column-value dispatch to another result map.
    pub discriminator: Option<Discriminator>,
    /// The projected column/constructor mappings, in declaration order.
    pub mappings: Vec<ResultMapping>,
}

impl ResultMap {
    /// Creates an empty result map for `target_type`.
    pub fn new(id: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            target_type: target_type.into(),
            extends: None,
            auto_mapping: None,
            discriminator: None,
            mappings: Vec::new(),
        }
    }

    /// Returns the mappings flagged `constructor`, in declaration order.
    pub fn constructor_mappings(&self) -> impl Iterator<Item = &ResultMapping> {
        self.mappings.iter().filter(|m| m.flags.constructor)
    }

    /// Returns the mappings flagged `id` (the row's identity columns, used
    /// to detect repeated parent rows in one-to-many joins).
    pub fn id_mappings(&self) -> impl Iterator<Item = &ResultMapping> {
        self.mappings.iter().filter(|m| m.flags.id)
    }

    /// Validates per-mapping invariants across the whole map.
    pub fn validate(&self) -> Result<()> {
        for mapping in &self.mappings {
            mapping.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_select_and_nested_result_map_together_is_invalid() {
        let mut mapping = ResultMapping::simple("orders", "order_id");
        mapping.nested_select = Some("Orders.selectById".to_string());
        mapping.nested_result_map = Some("orderResultMap".to_string());
        assert!(mapping.validate().is_err());
    }

    #[test]
    fn discriminator_rejects_duplicate_case() {
        let discriminator = Discriminator::new("kind").with_case("1", "carMap").unwrap();
        assert!(discriminator.with_case("1", "truckMap").is_err());
    }

    #[test]
    fn result_map_filters_constructor_and_id_mappings() {
        let mut map = ResultMap::new("Orders.full", "Order");
        let mut ctor_arg = ResultMapping::simple("id", "order_id");
        ctor_arg.flags.constructor = true;
        ctor_arg.flags.id = true;
        map.mappings.push(ctor_arg);
        map.mappings.push(ResultMapping::simple("total", "order_total"));
        assert_eq!(map.constructor_mappings().count(), 1);
        assert_eq!(map.id_mappings().count(), 1);
    }
}
