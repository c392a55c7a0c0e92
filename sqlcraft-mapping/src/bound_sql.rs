//! `BoundSql` (§3): the per-invocation render of a [`crate::SqlSource`].

use indexmap::IndexMap;

use sqlcraft_core::value::Value;

use crate::parameter_mapping::ParameterMapping;

/// The concrete SQL and bindings produced for one statement invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundSql {
    /// The final SQL string, with positional placeholders (`?`) standing in
    /// for every parameter mapping, in order.
    pub sql: String,
    /// The ordered parameter mappings, one per placeholder in `sql`.
    pub parameter_mappings: Vec<ParameterMapping>,
    /// The root parameter object passed to the invocation.
    pub parameter_object: Value,
    /// Auxiliary bindings introduced by `bind` and per-iteration `foreach`
    /// names, consulted when resolving a parameter mapping's property path
    /// that isn't found directly on `parameter_object`.
    pub additional_parameters: IndexMap<String, Value>,
}

impl BoundSql {
    /// Creates a `BoundSql` with no additional bindings.
    pub fn new(sql: impl Into<String>, parameter_mappings: Vec<ParameterMapping>, parameter_object: Value) -> Self {
        Self {
            sql: sql.into(),
            parameter_mappings,
            parameter_object,
            additional_parameters: IndexMap::new(),
        }
    }

    /// Resolves a parameter mapping's property value: checks
    /// `additional_parameters` first (bindings shadow the parameter
    /// object), then falls back to navigating `parameter_object`.
    pub fn resolve_property<'a>(&'a self, property: &str) -> Option<&'a Value> {
        if let Some(value) = self.additional_parameters.get(property) {
            return Some(value);
        }
        if property == "_parameter" {
            return Some(&self.parameter_object);
        }
        sqlcraft_core::value::navigate(&self.parameter_object, property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn additional_parameters_shadow_parameter_object() {
        let mut bound = BoundSql::new("select ?", vec![ParameterMapping::simple("id")], json!({"id": 1}));
        bound.additional_parameters.insert("id".to_string(), json!(99));
        assert_eq!(bound.resolve_property("id"), Some(&json!(99)));
    }

    #[test]
    fn falls_back_to_parameter_object() {
        let bound = BoundSql::new("select ?", vec![ParameterMapping::simple("name")], json!({"name": "ada"}));
        assert_eq!(bound.resolve_property("name"), Some(&json!("ada")));
    }
}
