//! The `#{...}` placeholder micro-grammar (§4.3 "Parameter Mapping", line
//! "Placeholder micro-grammar"): `property[,attr=value]*` where `attr` is
//! one of a fixed set of recognized names.
//!
//! This module only parses the syntax; turning a [`PlaceholderSpec`] into a
//! `ParameterMapping` (resolving the type handler, defaulting `jdbcType`,
//! etc.) is `sqlcraft-mapping`'s job, since that requires the type handler
//! registry this crate doesn't depend on.

use indexmap::IndexMap;

use sqlcraft_core::error::{Error, Result};

/// Attribute names recognized inside a `#{...}` span, besides the leading
/// property path.
pub const RECOGNIZED_ATTRS: &[&str] = &[
    "javaType",
    "jdbcType",
    "mode",
    "numericScale",
    "resultMap",
    "typeHandler",
    "jdbcTypeName",
];

/// A parsed `#{...}` span: the property path plus any `attr=value` pairs,
/// in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderSpec {
    /// The property path to read (or, for `foreach`-synthesized bindings,
    /// the bare binding name).
    pub property: String,
    /// The recognized attributes present, in the order they appeared.
    pub attrs: IndexMap<String, String>,
}

impl PlaceholderSpec {
    /// Parses the content between `#{` and `}` (exclusive of the delimiters
    /// themselves).
    pub fn parse(content: &str) -> Result<Self> {
        let mut parts = content.split(',');
        let property = parts.next().unwrap_or("").trim().to_string();
        if property.is_empty() {
            return Err(Error::build("`#{}` placeholder has an empty property path"));
        }
        let mut attrs = IndexMap::new();
        for part in parts {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let Some((key, value)) = part.split_once('=') else {
                return Err(Error::build(format!(
                    "`#{{{}}}` has a malformed attribute `{}` (expected `key=value`)",
                    content, part
                )));
            };
            let key = key.trim();
            let value = value.trim();
            if key.eq_ignore_ascii_case("expression") {
                return Err(Error::build(format!(
                    "`#{{{}}}`: `expression=` is reserved and may not be used",
                    content
                )));
            }
            if !RECOGNIZED_ATTRS.iter().any(|a| a.eq_ignore_ascii_case(key)) {
                return Err(Error::build(format!(
                    "`#{{{}}}`: unrecognized placeholder attribute `{}`",
                    content, key
                )));
            }
            attrs.insert(key.to_string(), value.to_string());
        }
        Ok(Self { property, attrs })
    }

    /// Returns the value of a recognized attribute, case-insensitively.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_property() {
        let spec = PlaceholderSpec::parse("id").unwrap();
        assert_eq!(spec.property, "id");
        assert!(spec.attrs.is_empty());
    }

    #[test]
    fn property_with_attrs_in_order() {
        let spec = PlaceholderSpec::parse("age, jdbcType=INTEGER, mode=IN").unwrap();
        assert_eq!(spec.property, "age");
        assert_eq!(spec.attr("jdbcType"), Some("INTEGER"));
        assert_eq!(spec.attr("mode"), Some("IN"));
        assert_eq!(spec.attrs.keys().collect::<Vec<_>>(), vec!["jdbcType", "mode"]);
    }

    #[test]
    fn expression_attr_rejected() {
        let err = PlaceholderSpec::parse("x, expression=1+1").unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn unrecognized_attr_rejected() {
        assert!(PlaceholderSpec::parse("x, bogus=1").is_err());
    }

    #[test]
    fn empty_property_rejected() {
        assert!(PlaceholderSpec::parse("").is_err());
        assert!(PlaceholderSpec::parse(", jdbcType=INTEGER").is_err());
    }
}
