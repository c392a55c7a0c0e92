//! Parses one mapper document (§6 "Mapper document") into its namespace,
//! cache declaration, result maps, and mapped statements. Forward-reference
//! resolution (`cache-ref`, `resultMap extends`) and database-id filtering
//! are applied by [`crate::builder::ConfigurationBuilder`], which has
//! visibility across documents; this module only parses one document's own
//! content.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use quick_xml::events::Event;
use quick_xml::Reader;

use sqlcraft_core::error::{Error, Result};
use sqlcraft_dynamic::{DynamicSqlSource, RawSqlSource, SqlNode};
use sqlcraft_mapping::{CommandType, KeyGenerator, MappedStatement, ParameterMapping, SelectKeyOrder, SqlSource, StatementId, StatementType};

use crate::environment::CacheSpec;
use crate::result_map_doc::parse_result_map;
use crate::sql_body::parse_nodes;
use crate::xml::{attrs, local_name, read_inner_xml};

/// One mapped statement parsed from a document, with its raw (not yet
/// database-id-filtered) metadata.
#[derive(Debug, Clone)]
pub struct ParsedStatement {
    /// The compiled statement, id already namespace-qualified.
    pub statement: MappedStatement,
}

/// The parsed content of one `<mapper>` document.
#[derive(Debug)]
pub struct ParsedMapperDocument {
    /// The mapper's namespace.
    pub namespace: String,
    /// `<cache-ref namespace=...>`, if present.
    pub cache_ref: Option<String>,
    /// This namespace's own `<cache>` declaration, if present.
    pub cache: Option<CacheSpec>,
    /// Result maps declared directly in this document (not yet merged with
    /// any `extends` base).
    pub result_maps: Vec<sqlcraft_mapping::ResultMap>,
    /// Mapped statements declared directly in this document.
    pub statements: Vec<ParsedStatement>,
}

/// Parses a mapper document's root `<mapper namespace="...">` element and
/// its children.
pub fn parse_mapper_document(xml: &str, shrink_whitespace: bool) -> Result<ParsedMapperDocument> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let namespace = loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if local_name(&e) == "mapper" => {
                let tag_attrs = attrs(&e)?;
                break tag_attrs
                    .get("namespace")
                    .cloned()
                    .ok_or_else(|| Error::build("`<mapper>` is missing required attribute `namespace`"))?;
            }
            Ok(Event::Eof) => return Err(Error::build("mapper document has no `<mapper>` root element")),
            Ok(_) => {}
            Err(e) => return Err(Error::build(format!("xml error: {e}"))),
        }
    };

    // First pass: collect `<sql>` fragments by id so `<include>` can
    // resolve fragments regardless of declaration order within the document.
    let inner = read_inner_xml(&mut reader, "mapper")?;
    let fragments = collect_sql_fragments(&inner)?;

    let mut doc = ParsedMapperDocument {
        namespace: namespace.clone(),
        cache_ref: None,
        cache: None,
        result_maps: Vec::new(),
        statements: Vec::new(),
    };

    let mut body_reader = Reader::from_str(&inner);
    body_reader.trim_text(true);
    loop {
        match body_reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                let tag_attrs = attrs(&e)?;
                let children = read_inner_xml(&mut body_reader, &name)?;
                apply_child(&mut doc, &name, &tag_attrs, &children, &fragments, shrink_whitespace)?;
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(&e);
                let tag_attrs = attrs(&e)?;
                apply_child(&mut doc, &name, &tag_attrs, "", &fragments, shrink_whitespace)?;
            }
            Ok(_) => {}
            Err(e) => return Err(Error::build(format!("xml error: {e}"))),
        }
    }
    Ok(doc)
}

fn collect_sql_fragments(inner: &str) -> Result<IndexMap<String, String>> {
    let mut reader = Reader::from_str(inner);
    reader.trim_text(false);
    let mut fragments = IndexMap::new();
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) if local_name(&e) == "sql" => {
                let tag_attrs = attrs(&e)?;
                let id = tag_attrs
                    .get("id")
                    .cloned()
                    .ok_or_else(|| Error::build("`<sql>` is missing required attribute `id`"))?;
                let body = read_inner_xml(&mut reader, "sql")?;
                fragments.insert(id, body);
            }
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                let _ = read_inner_xml(&mut reader, &name)?;
            }
            Ok(_) => {}
            Err(e) => return Err(Error::build(format!("xml error: {e}"))),
        }
    }
    Ok(fragments)
}

#[allow(clippy::too_many_arguments)]
fn apply_child(
    doc: &mut ParsedMapperDocument,
    name: &str,
    tag_attrs: &IndexMap<String, String>,
    children: &str,
    fragments: &IndexMap<String, String>,
    shrink_whitespace: bool,
) -> Result<()> {
    match name {
        "sql" => Ok(()),
        "cache-ref" => {
            doc.cache_ref = Some(
                tag_attrs
                    .get("namespace")
                    .cloned()
                    .ok_or_else(|| Error::build("`<cache-ref>` is missing required attribute `namespace`"))?,
            );
            Ok(())
        }
        "cache" => {
            doc.cache = Some(parse_cache(tag_attrs, children)?);
            Ok(())
        }
        "resultMap" => {
            let id = required(tag_attrs, "resultMap", "id")?;
            let target_type = required(tag_attrs, "resultMap", "type")?;
            let extends = tag_attrs.get("extends").cloned();
            let auto_mapping = tag_attrs.get("autoMapping").map(|s| s == "true");
            let full_id = format!("{}.{}", doc.namespace, id);
            let full_extends = extends.map(|base| qualify(&doc.namespace, &base));
            let mut result_map = parse_result_map(full_id, target_type, full_extends, auto_mapping, children)?;
            qualify_nested_refs(&mut result_map, &doc.namespace);
            doc.result_maps.push(result_map);
            Ok(())
        }
        "select" | "insert" | "update" | "delete" => {
            let statement = parse_statement(&doc.namespace, name, tag_attrs, children, fragments, shrink_whitespace)?;
            doc.statements.push(ParsedStatement { statement });
            Ok(())
        }
        other => Err(Error::build(format!("unrecognized mapper child `{other}`"))),
    }
}

fn parse_cache(tag_attrs: &IndexMap<String, String>, inner: &str) -> Result<CacheSpec> {
    let mut spec = CacheSpec {
        eviction: tag_attrs.get("eviction").cloned().unwrap_or_else(|| "LRU".to_string()),
        flush_interval: tag_attrs.get("flushInterval").and_then(|s| s.parse().ok()),
        size: tag_attrs.get("size").and_then(|s| s.parse().ok()),
        read_only: tag_attrs.get("readOnly").map(|s| s == "true").unwrap_or(false),
        blocking: tag_attrs.get("blocking").map(|s| s == "true").unwrap_or(false),
        properties: IndexMap::new(),
    };
    let mut reader = Reader::from_str(inner);
    reader.trim_text(true);
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Empty(e)) if local_name(&e) == "property" => {
                let prop_attrs = attrs(&e)?;
                let name = required(&prop_attrs, "property", "name")?;
                let value = required(&prop_attrs, "property", "value")?;
                spec.properties.insert(name, value);
            }
            Ok(_) => {}
            Err(e) => return Err(Error::build(format!("xml error: {e}"))),
        }
    }
    Ok(spec)
}

#[allow(clippy::too_many_arguments)]
fn parse_statement(namespace: &str, tag_name: &str, tag_attrs: &IndexMap<String, String>, body_xml: &str, fragments: &IndexMap<String, String>, shrink_whitespace: bool) -> Result<MappedStatement> {
    let id_attr = required(tag_attrs, tag_name, "id")?;
    let id = StatementId::new(namespace, &id_attr);
    let command_type = match tag_name {
        "select" => CommandType::Select,
        "insert" => CommandType::Insert,
        "update" => CommandType::Update,
        "delete" => CommandType::Delete,
        _ => unreachable!("caller only dispatches select/insert/update/delete"),
    };

    let mut seen = HashSet::new();
    let nodes = parse_nodes(body_xml, fragments, &mut seen)?;
    let database_id = tag_attrs.get("databaseId").cloned();
    let sql_source: Arc<dyn SqlSource> = match raw_text(&nodes) {
        Some(text) => Arc::new(RawSqlSource::compile(&text)?),
        None => Arc::new(DynamicSqlSource::new(nodes, database_id.clone(), shrink_whitespace)),
    };

    let (default_flush, default_use_cache) = MappedStatement::default_cache_flags(command_type);
    let result_map_ids = tag_attrs
        .get("resultMap")
        .map(|s| s.split(',').map(|part| qualify(namespace, part.trim())).collect())
        .unwrap_or_default();
    let result_sets = tag_attrs
        .get("resultSets")
        .map(|s| s.split(',').map(|part| part.trim().to_string()).collect())
        .unwrap_or_default();

    let key_generator = if let Some(statement_id) = tag_attrs.get("__selectKeyStatementId") {
        KeyGenerator::SelectKey {
            statement_id: statement_id.clone(),
            order: if tag_attrs.get("__selectKeyOrder").map(String::as_str) == Some("BEFORE") {
                SelectKeyOrder::Before
            } else {
                SelectKeyOrder::After
            },
        }
    } else if tag_attrs.get("useGeneratedKeys").map(String::as_str) == Some("true") {
        KeyGenerator::Jdbc3
    } else {
        KeyGenerator::NoKeyGenerator
    };

    Ok(MappedStatement {
        id,
        command_type,
        statement_type: tag_attrs
            .get("statementType")
            .map(|s| parse_statement_type(s))
            .unwrap_or_default(),
        sql_source: Some(sql_source),
        parameter_type: tag_attrs.get("parameterType").cloned(),
        result_type: tag_attrs.get("resultType").cloned(),
        result_map_ids,
        fetch_size: tag_attrs.get("fetchSize").and_then(|s| s.parse().ok()),
        timeout: tag_attrs.get("timeout").and_then(|s| s.parse().ok()),
        flush_cache: tag_attrs.get("flushCache").map(|s| s == "true").unwrap_or(default_flush),
        use_cache: tag_attrs.get("useCache").map(|s| s == "true").unwrap_or(default_use_cache),
        key_generator,
        key_property: tag_attrs.get("keyProperty").cloned(),
        key_column: tag_attrs.get("keyColumn").cloned(),
        database_id,
        lang: tag_attrs.get("lang").cloned().unwrap_or_else(|| "xml".to_string()),
        result_sets,
    })
}

fn parse_statement_type(raw: &str) -> StatementType {
    match raw.to_ascii_uppercase().as_str() {
        "SIMPLE" => StatementType::Simple,
        "CALLABLE" => StatementType::Callable,
        _ => StatementType::Prepared,
    }
}

/// Returns `Some(concatenated text)` when `nodes` has no dynamic tags and no
/// `${...}` substitutions, qualifying the statement for the cheaper
/// build-once `RawSqlSource` rather than a per-call `DynamicSqlSource`.
fn raw_text(nodes: &[SqlNode]) -> Option<String> {
    let mut text = String::new();
    for node in nodes {
        match node {
            SqlNode::Text(t) if !t.contains("${") => text.push_str(t),
            _ => return None,
        }
    }
    Some(text)
}

fn qualify(namespace: &str, id: &str) -> String {
    if id.contains('.') {
        id.to_string()
    } else {
        format!("{namespace}.{id}")
    }
}

fn qualify_nested_refs(result_map: &mut sqlcraft_mapping::ResultMap, namespace: &str) {
    for mapping in &mut result_map.mappings {
        if let Some(select) = &mapping.nested_select {
            mapping.nested_select = Some(qualify(namespace, select));
        }
        if let Some(nested) = &mapping.nested_result_map {
            mapping.nested_result_map = Some(qualify(namespace, nested));
        }
    }
    if let Some(discriminator) = &mut result_map.discriminator {
        for case in discriminator.cases.values_mut() {
            *case = qualify(namespace, case);
        }
    }
}

fn required(tag_attrs: &IndexMap<String, String>, tag: &str, attr: &str) -> Result<String> {
    tag_attrs
        .get(attr)
        .cloned()
        .ok_or_else(|| Error::build(format!("`<{tag}>` is missing required attribute `{attr}`")))
}

/// Also consumed by `ParameterMapping`-driven validation elsewhere; kept
/// `pub(crate)` visible only through `ParsedStatement`/`ParsedMapperDocument`.
#[allow(dead_code)]
fn _assert_parameter_mapping_in_scope(_: &ParameterMapping) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_namespace_and_plain_select() {
        let xml = r#"
            <mapper namespace="Users">
                <select id="selectById" resultType="User">select * from users where id = #{id}</select>
            </mapper>
        "#;
        let doc = parse_mapper_document(xml, false).unwrap();
        assert_eq!(doc.namespace, "Users");
        assert_eq!(doc.statements.len(), 1);
        assert_eq!(doc.statements[0].statement.id.to_string(), "Users.selectById");
        assert_eq!(doc.statements[0].statement.command_type, CommandType::Select);
    }

    #[test]
    fn qualifies_bare_result_map_and_nested_select() {
        let xml = r#"
            <mapper namespace="Orders">
                <resultMap id="full" type="Order">
                    <id property="id" column="order_id"/>
                    <association property="customer" select="Customers.selectById" column="customer_id"/>
                </resultMap>
                <select id="selectAll" resultMap="full">select * from orders</select>
            </mapper>
        "#;
        let doc = parse_mapper_document(xml, false).unwrap();
        assert_eq!(doc.result_maps[0].id, "Orders.full");
        assert_eq!(doc.result_maps[0].mappings[1].nested_select.as_deref(), Some("Customers.selectById"));
        assert_eq!(doc.statements[0].statement.result_map_ids, vec!["Orders.full".to_string()]);
    }

    #[test]
    fn include_pulls_in_shared_fragment() {
        let xml = r#"
            <mapper namespace="Users">
                <sql id="cols">id, name</sql>
                <select id="selectAll" resultType="User">select <include refid="cols"/> from users</select>
            </mapper>
        "#;
        let doc = parse_mapper_document(xml, false).unwrap();
        assert_eq!(doc.statements.len(), 1);
    }

    #[test]
    fn parses_cache_declaration() {
        let xml = r#"
            <mapper namespace="Users">
                <cache eviction="FIFO" size="512" readOnly="true"/>
            </mapper>
        "#;
        let doc = parse_mapper_document(xml, false).unwrap();
        let cache = doc.cache.unwrap();
        assert_eq!(cache.eviction, "FIFO");
        assert_eq!(cache.size, Some(512));
        assert!(cache.read_only);
    }
}
