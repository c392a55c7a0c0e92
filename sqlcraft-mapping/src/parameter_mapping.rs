//! `ParameterMapping` (§3): one ordered element produced by `#{...}`
//! parsing.

use serde::{Deserialize, Serialize};

use sqlcraft_core::type_handler::{JdbcType, ValueKind};

use crate::command::ParameterMode;

/// One `#{...}` placeholder's resolved binding description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterMapping {
    /// The property path read from the parameter object (or a synthetic
    /// `foreach`/`bind` binding name).
    pub property: String,
    /// The logical value kind used to key the type handler registry,
    /// explicit (`javaType=`) or inferred from the parameter value at bind
    /// time.
    pub value_kind: Option<ValueKind>,
    /// The column-side jdbc type, explicit or inferred.
    pub jdbc_type: Option<JdbcType>,
    /// An explicitly named type handler, overriding registry lookup.
    pub type_handler: Option<String>,
    /// Parameter direction; relevant to `Callable` statements.
    #[serde(default)]
    pub mode: ParameterMode,
    /// Numeric scale, for decimal OUT parameters.
    pub numeric_scale: Option<u32>,
    /// The result map id used to project an OUT cursor parameter.
    pub result_map_id: Option<String>,
}

impl ParameterMapping {
    /// Creates a mapping for a bare `#{property}` placeholder with no
    /// explicit attributes; `value_kind`/`jdbc_type` are inferred at bind
    /// time from the actual parameter value.
    pub fn simple(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value_kind: None,
            jdbc_type: None,
            type_handler: None,
            mode: ParameterMode::In,
            numeric_scale: None,
            result_map_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_mapping_has_no_explicit_type_attrs() {
        let mapping = ParameterMapping::simple("id");
        assert_eq!(mapping.property, "id");
        assert!(mapping.jdbc_type.is_none());
        assert_eq!(mapping.mode, ParameterMode::In);
    }
}
