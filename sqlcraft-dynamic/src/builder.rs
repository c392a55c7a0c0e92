//! The SQL Source Pipeline (§4.6): resolves `#{...}` placeholders to
//! positional markers plus an ordered parameter mapping list, for both the
//! Raw and Dynamic concrete sources.

use sqlcraft_core::error::Result;
use sqlcraft_core::type_handler::{JdbcType, ValueKind};
use sqlcraft_core::value::Value;
use sqlcraft_lexer::placeholder::PlaceholderSpec;
use sqlcraft_lexer::token_parser::PARAMETER_TOKEN_PARSER;
use sqlcraft_mapping::{BoundSql, ParameterMapping, ParameterMode, SqlSource};

use crate::context::DynamicContext;
use crate::node::SqlNode;

/// Replaces every `#{...}` placeholder in `text` with a positional `?`
/// marker, returning the rewritten SQL and the ordered parameter mappings
/// describing how to bind each marker, in order (§4.6, §3 "Binding
/// round-trip").
pub fn extract_parameter_mappings(text: &str) -> Result<(String, Vec<ParameterMapping>)> {
    let mut mappings = Vec::new();
    let mut error = None;
    let sql = PARAMETER_TOKEN_PARSER.parse(text, |content| {
        if error.is_some() {
            return String::new();
        }
        match PlaceholderSpec::parse(content) {
            Ok(spec) => {
                mappings.push(parameter_mapping_from_spec(spec));
                "?".to_string()
            }
            Err(e) => {
                error = Some(e);
                String::new()
            }
        }
    });
    match error {
        Some(e) => Err(e),
        None => Ok((sql, mappings)),
    }
}

fn parameter_mapping_from_spec(spec: PlaceholderSpec) -> ParameterMapping {
    let mode = match spec.attr("mode") {
        Some(m) if m.eq_ignore_ascii_case("OUT") => ParameterMode::Out,
        Some(m) if m.eq_ignore_ascii_case("INOUT") => ParameterMode::InOut,
        _ => ParameterMode::In,
    };
    ParameterMapping {
        property: spec.property,
        value_kind: spec.attr("javaType").map(parse_value_kind),
        jdbc_type: spec.attr("jdbcType").map(parse_jdbc_type),
        type_handler: spec.attr("typeHandler").map(str::to_string),
        mode,
        numeric_scale: spec.attr("numericScale").and_then(|s| s.parse().ok()),
        result_map_id: spec.attr("resultMap").map(str::to_string),
    }
}

fn parse_value_kind(name: &str) -> ValueKind {
    match name.to_ascii_lowercase().as_str() {
        "bool" | "boolean" => ValueKind::Bool,
        "i64" | "long" | "int" | "integer" | "short" | "byte" => ValueKind::I64,
        "f64" | "double" | "float" | "decimal" | "bigdecimal" => ValueKind::F64,
        "string" | "str" => ValueKind::Str,
        "bytes" | "byte[]" | "blob" => ValueKind::Bytes,
        "date" | "datetime" | "timestamp" => ValueKind::DateTime,
        "json" => ValueKind::Json,
        "enum" => ValueKind::Enum,
        _ => ValueKind::Other,
    }
}

fn parse_jdbc_type(name: &str) -> JdbcType {
    match name.to_ascii_uppercase().as_str() {
        "NULL" => JdbcType::Null,
        "BOOLEAN" | "BIT" => JdbcType::Boolean,
        "TINYINT" => JdbcType::TinyInt,
        "SMALLINT" => JdbcType::SmallInt,
        "INTEGER" | "INT" => JdbcType::Integer,
        "BIGINT" => JdbcType::BigInt,
        "REAL" => JdbcType::Real,
        "FLOAT" => JdbcType::Float,
        "DOUBLE" => JdbcType::Double,
        "DECIMAL" | "NUMERIC" => JdbcType::Decimal,
        "CHAR" => JdbcType::Char,
        "VARCHAR" => JdbcType::VarChar,
        "LONGVARCHAR" => JdbcType::LongVarChar,
        "DATE" => JdbcType::Date,
        "TIME" => JdbcType::Time,
        "TIMESTAMP" => JdbcType::Timestamp,
        "BINARY" => JdbcType::Binary,
        "VARBINARY" => JdbcType::VarBinary,
        "BLOB" => JdbcType::Blob,
        "CLOB" => JdbcType::Clob,
        "ARRAY" => JdbcType::Array,
        "CURSOR" => JdbcType::Cursor,
        _ => JdbcType::Other,
    }
}

/// Collapses runs of whitespace into a single space and trims both ends,
/// per the `shrinkWhitespacesInSql` setting.
pub fn shrink_whitespace(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut pending_space = false;
    for ch in sql.chars() {
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(ch);
    }
    out
}

/// A statement with no dynamic nodes (§4.6 "Raw"): compiled once, its SQL
/// and parameter mappings are replayed verbatim for every invocation.
#[derive(Debug)]
pub struct RawSqlSource {
    sql: String,
    parameter_mappings: Vec<ParameterMapping>,
}

impl RawSqlSource {
    /// Compiles `text` (containing `${...}`/`#{...}` but no dynamic tags)
    /// into a reusable source.
    ///
    /// `${...}` substitution has no variables available at this stage (a
    /// Raw source has no per-invocation context) so bare text is expected;
    /// a Raw source whose text relies on `${...}` should instead be
    /// compiled as Dynamic.
    pub fn compile(text: &str) -> Result<Self> {
        let (sql, parameter_mappings) = extract_parameter_mappings(text)?;
        Ok(Self { sql, parameter_mappings })
    }
}

impl SqlSource for RawSqlSource {
    fn bound_sql(&self, parameter_object: &Value) -> Result<BoundSql> {
        Ok(BoundSql::new(self.sql.clone(), self.parameter_mappings.clone(), parameter_object.clone()))
    }
}

/// A statement whose body contains dynamic nodes (§4.6 "Dynamic"): rendered
/// fresh for every invocation against the call's parameter object.
#[derive(Debug)]
pub struct DynamicSqlSource {
    root: Vec<SqlNode>,
    database_id: Option<String>,
    shrink_whitespace: bool,
}

impl DynamicSqlSource {
    /// Builds a source from a compiled node tree.
    pub fn new(root: Vec<SqlNode>, database_id: Option<String>, shrink_whitespace: bool) -> Self {
        Self {
            root,
            database_id,
            shrink_whitespace,
        }
    }
}

impl SqlSource for DynamicSqlSource {
    fn bound_sql(&self, parameter_object: &Value) -> Result<BoundSql> {
        let mut ctx = DynamicContext::new(parameter_object.clone(), self.database_id.as_deref());
        for node in &self.root {
            node.apply(&mut ctx)?;
        }
        let additional_parameters = ctx.bindings.clone().into_entries();
        let rendered = ctx.into_sql();
        let rendered = if self.shrink_whitespace {
            shrink_whitespace(&rendered)
        } else {
            rendered
        };
        let (sql, parameter_mappings) = extract_parameter_mappings(&rendered)?;
        let mut bound = BoundSql::new(sql, parameter_mappings, parameter_object.clone());
        bound.additional_parameters = additional_parameters;
        Ok(bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_source_replaces_placeholders_with_positional_markers() {
        let source = RawSqlSource::compile("select * from t where id = #{id} and name = #{name}").unwrap();
        let bound = source.bound_sql(&json!({"id": 1, "name": "ada"})).unwrap();
        assert_eq!(bound.sql, "select * from t where id = ? and name = ?");
        assert_eq!(bound.parameter_mappings.len(), 2);
        assert_eq!(bound.parameter_mappings[0].property, "id");
        assert_eq!(bound.parameter_mappings[1].property, "name");
    }

    #[test]
    fn dynamic_source_renders_per_invocation() {
        let source = DynamicSqlSource::new(
            vec![
                SqlNode::Text("select * from t ".to_string()),
                SqlNode::where_node(vec![SqlNode::If {
                    test: "a!=null".to_string(),
                    children: vec![SqlNode::Text(" AND a=#{a}".to_string())],
                }]),
            ],
            None,
            true,
        );
        let with_a = source.bound_sql(&json!({"a": 1})).unwrap();
        assert_eq!(with_a.sql, "select * from t WHERE a=?");
        assert_eq!(with_a.parameter_mappings.len(), 1);

        let without_a = source.bound_sql(&json!({"a": null})).unwrap();
        assert_eq!(without_a.sql, "select * from t");
        assert!(without_a.parameter_mappings.is_empty());
    }

    #[test]
    fn placeholder_attrs_populate_parameter_mapping() {
        let source = RawSqlSource::compile("update t set n=#{name,jdbcType=VARCHAR}").unwrap();
        let bound = source.bound_sql(&json!({"name": "x"})).unwrap();
        assert_eq!(bound.parameter_mappings[0].jdbc_type, Some(JdbcType::VarChar));
    }

    #[test]
    fn shrink_whitespace_collapses_runs() {
        assert_eq!(shrink_whitespace("a   b\n\tc"), "a b c");
        assert_eq!(shrink_whitespace("  leading"), "leading");
    }
}
