//! `<resultMap>` (§6): constructor args, `id`/`result`,
//! `association`/`collection`, and `discriminator` children.

use indexmap::IndexMap;
use quick_xml::events::Event;
use quick_xml::Reader;

use sqlcraft_core::error::{Error, Result};
use sqlcraft_core::type_handler::{JdbcType, ValueKind};
use sqlcraft_mapping::{Discriminator, FetchType, ResultMap, ResultMapping, ResultMappingFlags};

use crate::xml::{attrs, local_name, read_inner_xml};

/// Parses one `<resultMap>` element's already-extracted attributes and
/// inner XML into a [`ResultMap`]. `extends`/`autoMapping` stay raw strings
/// on the returned value; resolving `extends` against another map is a
/// build-time concern (it may not be registered yet).
pub fn parse_result_map(id: String, target_type: String, extends: Option<String>, auto_mapping: Option<bool>, inner: &str) -> Result<ResultMap> {
    let mut map = ResultMap::new(id, target_type);
    map.extends = extends;
    map.auto_mapping = auto_mapping;

    let mut reader = Reader::from_str(inner);
    reader.trim_text(true);
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                let tag_attrs = attrs(&e)?;
                let children = read_inner_xml(&mut reader, &name)?;
                apply_element(&mut map, &name, &tag_attrs, &children)?;
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(&e);
                let tag_attrs = attrs(&e)?;
                apply_element(&mut map, &name, &tag_attrs, "")?;
            }
            Ok(Event::Text(_)) | Ok(Event::CData(_)) => {}
            Ok(_) => {}
            Err(e) => return Err(Error::build(format!("xml error: {e}"))),
        }
    }
    map.validate()?;
    Ok(map)
}

fn apply_element(map: &mut ResultMap, name: &str, tag_attrs: &IndexMap<String, String>, inner: &str) -> Result<()> {
    match name {
        "constructor" => parse_constructor(map, inner),
        "id" => {
            let mut mapping = parse_mapping(tag_attrs, "property")?;
            mapping.flags.id = true;
            map.mappings.push(mapping);
            Ok(())
        }
        "result" => {
            let mapping = parse_mapping(tag_attrs, "property")?;
            map.mappings.push(mapping);
            Ok(())
        }
        "association" | "collection" => {
            let mut mapping = parse_mapping(tag_attrs, "property")?;
            mapping.nested_result_map = tag_attrs.get("resultMap").cloned();
            mapping.of_type = tag_attrs.get("ofType").cloned();
            map.mappings.push(mapping);
            Ok(())
        }
        "discriminator" => {
            map.discriminator = Some(parse_discriminator(tag_attrs, inner)?);
            Ok(())
        }
        other => Err(Error::build(format!("unrecognized resultMap child `{other}`"))),
    }
}

fn parse_constructor(map: &mut ResultMap, inner: &str) -> Result<()> {
    let mut reader = Reader::from_str(inner);
    reader.trim_text(true);
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) => {
                let name = local_name(&e);
                let tag_attrs = attrs(&e)?;
                if name != "idArg" && name != "arg" {
                    return Err(Error::build(format!("unrecognized constructor child `{name}`")));
                }
                let mut mapping = parse_mapping(&tag_attrs, "name")?;
                mapping.flags.constructor = true;
                mapping.flags.id = name == "idArg";
                map.mappings.push(mapping);
            }
            Ok(_) => {}
            Err(e) => return Err(Error::build(format!("xml error: {e}"))),
        }
    }
    Ok(())
}

fn parse_mapping(tag_attrs: &IndexMap<String, String>, name_attr: &str) -> Result<ResultMapping> {
    let property = tag_attrs
        .get(name_attr)
        .cloned()
        .ok_or_else(|| Error::build(format!("result mapping is missing required attribute `{name_attr}`")))?;
    let mut mapping = ResultMapping {
        property,
        column: tag_attrs.get("column").cloned(),
        value_kind: tag_attrs.get("javaType").map(|s| parse_value_kind(s)),
        jdbc_type: tag_attrs.get("jdbcType").map(|s| parse_jdbc_type(s)),
        type_handler: tag_attrs.get("typeHandler").cloned(),
        flags: ResultMappingFlags::default(),
        nested_select: tag_attrs.get("select").cloned(),
        nested_result_map: tag_attrs.get("resultMap").cloned(),
        foreign_columns: parse_foreign_columns(tag_attrs.get("foreignColumn")),
        not_null_columns: parse_comma_list(tag_attrs.get("notNullColumn")),
        column_prefix: tag_attrs.get("columnPrefix").cloned(),
        fetch_type: tag_attrs
            .get("fetchType")
            .map(|s| parse_fetch_type(s))
            .unwrap_or_default(),
        of_type: tag_attrs.get("ofType").cloned(),
        result_set: tag_attrs.get("resultSet").cloned(),
    };
    mapping.validate()?;
    Ok(mapping)
}

fn parse_discriminator(tag_attrs: &IndexMap<String, String>, inner: &str) -> Result<Discriminator> {
    let column = tag_attrs
        .get("column")
        .cloned()
        .ok_or_else(|| Error::build("`<discriminator>` is missing required attribute `column`"))?;
    let mut discriminator = Discriminator::new(column);
    discriminator.jdbc_type = tag_attrs.get("jdbcType").map(|s| parse_jdbc_type(s));

    let mut reader = Reader::from_str(inner);
    reader.trim_text(true);
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) => {
                let name = local_name(&e);
                if name != "case" {
                    return Err(Error::build(format!("unrecognized discriminator child `{name}`")));
                }
                let case_attrs = attrs(&e)?;
                let value = case_attrs
                    .get("value")
                    .cloned()
                    .ok_or_else(|| Error::build("`<case>` is missing required attribute `value`"))?;
                let result_map = case_attrs
                    .get("resultMap")
                    .cloned()
                    .ok_or_else(|| Error::build("`<case>` is missing required attribute `resultMap`"))?;
                discriminator = discriminator.with_case(value, result_map)?;
            }
            Ok(_) => {}
            Err(e) => return Err(Error::build(format!("xml error: {e}"))),
        }
    }
    Ok(discriminator)
}

fn parse_foreign_columns(raw: Option<&String>) -> IndexMap<String, String> {
    let mut out = IndexMap::new();
    let Some(raw) = raw else { return out };
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.split_once('=') {
            Some((column, param)) => {
                out.insert(column.trim().to_string(), param.trim().to_string());
            }
            None => {
                out.insert(String::new(), part.to_string());
            }
        }
    }
    out
}

fn parse_comma_list(raw: Option<&String>) -> Vec<String> {
    match raw {
        None => vec![],
        Some(s) => s.split(',').map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect(),
    }
}

fn parse_fetch_type(raw: &str) -> FetchType {
    match raw.to_ascii_uppercase().as_str() {
        "LAZY" => FetchType::Lazy,
        "EAGER" => FetchType::Eager,
        _ => FetchType::Default,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_id_result_and_association() {
        let xml = r#"
            <id property="id" column="order_id"/>
            <result property="total" column="order_total"/>
            <association property="customer" resultMap="Customers.full" columnPrefix="cust_"/>
        "#;
        let map = parse_result_map("Orders.full".to_string(), "Order".to_string(), None, None, xml).unwrap();
        assert_eq!(map.mappings.len(), 3);
        assert!(map.mappings[0].flags.id);
        assert_eq!(map.mappings[2].nested_result_map.as_deref(), Some("Customers.full"));
        assert_eq!(map.mappings[2].column_prefix.as_deref(), Some("cust_"));
    }

    #[test]
    fn parses_constructor_args() {
        let xml = r#"<constructor><idArg name="id" column="order_id"/><arg name="total" column="order_total"/></constructor>"#;
        let map = parse_result_map("Orders.ctor".to_string(), "Order".to_string(), None, None, xml).unwrap();
        assert_eq!(map.constructor_mappings().count(), 2);
        assert_eq!(map.id_mappings().count(), 1);
    }

    #[test]
    fn parses_discriminator_cases() {
        let xml = r#"<discriminator column="kind"><case value="car" resultMap="carMap"/><case value="truck" resultMap="truckMap"/></discriminator>"#;
        let map = parse_result_map("Vehicles.base".to_string(), "Vehicle".to_string(), None, None, xml).unwrap();
        let discriminator = map.discriminator.unwrap();
        assert_eq!(discriminator.column, "kind");
        assert_eq!(discriminator.cases.get("truck"), Some(&"truckMap".to_string()));
    }

    #[test]
    fn composite_foreign_column_parses_pairs() {
        let out = parse_foreign_columns(Some(&"a=x,b=y".to_string()));
        assert_eq!(out.get("a"), Some(&"x".to_string()));
        assert_eq!(out.get("b"), Some(&"y".to_string()));
    }
}
