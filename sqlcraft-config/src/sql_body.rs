//! Parses a statement or `<sql>` fragment body — mixed text and dynamic
//! tags (`if`, `choose/when/otherwise`, `where`, `set`, `trim`, `foreach`,
//! `bind`, `include`) — into a [`SqlNode`] tree (§4.5, §6 mapper grammar).

use std::collections::HashSet;

use indexmap::IndexMap;
use quick_xml::events::Event;
use quick_xml::Reader;

use sqlcraft_core::error::{Error, Result};
use sqlcraft_dynamic::SqlNode;

use crate::xml::{attrs, local_name, read_inner_xml, substitute_properties};

/// Parses `xml` (the inner body of a `<select>`/`<insert>`/... or `<sql>`
/// element) into a node tree. `fragments` maps a `<sql id=...>`'s id to its
/// own raw inner XML, for resolving `<include refid=...>`; `seen` guards
/// against a fragment including itself, directly or transitively.
pub fn parse_nodes(xml: &str, fragments: &IndexMap<String, String>, seen: &mut HashSet<String>) -> Result<Vec<SqlNode>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);
    let mut nodes = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|e| Error::build(format!("xml text error: {e}")))?.into_owned();
                if !text.is_empty() {
                    nodes.push(SqlNode::Text(text));
                }
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                nodes.push(SqlNode::Text(text));
            }
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                let tag_attrs = attrs(&e)?;
                let inner = read_inner_xml(&mut reader, &name)?;
                nodes.push(parse_tag(&name, &tag_attrs, &inner, fragments, seen)?);
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(&e);
                let tag_attrs = attrs(&e)?;
                nodes.push(parse_empty_tag(&name, &tag_attrs, fragments, seen)?);
            }
            Ok(Event::End(_)) => {
                return Err(Error::build("unexpected closing tag in sql body"));
            }
            Ok(_) => {}
            Err(e) => return Err(Error::build(format!("xml error: {e}"))),
        }
    }
    Ok(nodes)
}

fn parse_tag(name: &str, tag_attrs: &IndexMap<String, String>, inner: &str, fragments: &IndexMap<String, String>, seen: &mut HashSet<String>) -> Result<SqlNode> {
    match name {
        "if" => {
            let test = require_attr(tag_attrs, "if", "test")?;
            Ok(SqlNode::If {
                test,
                children: parse_nodes(inner, fragments, seen)?,
            })
        }
        "where" => Ok(SqlNode::where_node(parse_nodes(inner, fragments, seen)?)),
        "set" => Ok(SqlNode::set_node(parse_nodes(inner, fragments, seen)?)),
        "trim" => {
            let prefix = tag_attrs.get("prefix").cloned();
            let suffix = tag_attrs.get("suffix").cloned();
            let prefix_overrides = split_overrides(tag_attrs.get("prefixOverrides"));
            let suffix_overrides = split_overrides(tag_attrs.get("suffixOverrides"));
            Ok(SqlNode::Trim {
                children: parse_nodes(inner, fragments, seen)?,
                prefix,
                suffix,
                prefix_overrides,
                suffix_overrides,
            })
        }
        "foreach" => {
            let collection = require_attr(tag_attrs, "foreach", "collection")?;
            Ok(SqlNode::Foreach {
                collection,
                item: tag_attrs.get("item").cloned(),
                index: tag_attrs.get("index").cloned(),
                open: tag_attrs.get("open").cloned(),
                close: tag_attrs.get("close").cloned(),
                separator: tag_attrs.get("separator").cloned(),
                children: parse_nodes(inner, fragments, seen)?,
            })
        }
        "choose" => parse_choose(inner, fragments, seen),
        "bind" => Ok(bind_node(tag_attrs)?),
        "include" => include_node(tag_attrs, inner, fragments, seen),
        other => Err(Error::build(format!("unrecognized sql body tag `{other}`"))),
    }
}

fn parse_empty_tag(name: &str, tag_attrs: &IndexMap<String, String>, fragments: &IndexMap<String, String>, seen: &mut HashSet<String>) -> Result<SqlNode> {
    match name {
        "bind" => bind_node(tag_attrs),
        "include" => include_node(tag_attrs, "", fragments, seen),
        "where" => Ok(SqlNode::where_node(vec![])),
        "set" => Ok(SqlNode::set_node(vec![])),
        other => Err(Error::build(format!("unrecognized empty sql body tag `{other}`"))),
    }
}

fn bind_node(tag_attrs: &IndexMap<String, String>) -> Result<SqlNode> {
    Ok(SqlNode::Bind {
        name: require_attr(tag_attrs, "bind", "name")?,
        expression: require_attr(tag_attrs, "bind", "value")?,
    })
}

fn include_node(tag_attrs: &IndexMap<String, String>, inner: &str, fragments: &IndexMap<String, String>, seen: &mut HashSet<String>) -> Result<SqlNode> {
    let refid = require_attr(tag_attrs, "include", "refid")?;
    if seen.contains(&refid) {
        return Err(Error::build(format!("circular sql fragment reference via `{refid}`")));
    }
    let fragment_xml = fragments
        .get(&refid)
        .ok_or_else(|| Error::incomplete_reference("sql fragment", refid.clone()))?;
    let overrides = parse_include_properties(inner)?;
    let substituted = substitute_properties(fragment_xml, &overrides);
    seen.insert(refid.clone());
    let children = parse_nodes(&substituted, fragments, seen)?;
    seen.remove(&refid);
    Ok(SqlNode::Trim {
        children,
        prefix: None,
        suffix: None,
        prefix_overrides: vec![],
        suffix_overrides: vec![],
    })
}

fn parse_include_properties(inner: &str) -> Result<IndexMap<String, String>> {
    let mut reader = Reader::from_str(inner);
    reader.trim_text(true);
    let mut overrides = IndexMap::new();
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Empty(e)) if local_name(&e) == "property" => {
                let tag_attrs = attrs(&e)?;
                let name = require_attr(&tag_attrs, "property", "name")?;
                let value = require_attr(&tag_attrs, "property", "value")?;
                overrides.insert(name, value);
            }
            Ok(_) => {}
            Err(e) => return Err(Error::build(format!("xml error: {e}"))),
        }
    }
    Ok(overrides)
}

fn parse_choose(inner: &str, fragments: &IndexMap<String, String>, seen: &mut HashSet<String>) -> Result<SqlNode> {
    let mut reader = Reader::from_str(inner);
    reader.trim_text(true);
    let mut whens = Vec::new();
    let mut otherwise = None;
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                let tag_attrs = attrs(&e)?;
                let children_xml = read_inner_xml(&mut reader, &name)?;
                match name.as_str() {
                    "when" => {
                        let test = require_attr(&tag_attrs, "when", "test")?;
                        whens.push((test, parse_nodes(&children_xml, fragments, seen)?));
                    }
                    "otherwise" => {
                        otherwise = Some(parse_nodes(&children_xml, fragments, seen)?);
                    }
                    other => return Err(Error::build(format!("unexpected `{other}` inside `choose`"))),
                }
            }
            Ok(Event::Text(_)) | Ok(Event::CData(_)) => {}
            Ok(_) => {}
            Err(e) => return Err(Error::build(format!("xml error: {e}"))),
        }
    }
    Ok(SqlNode::Choose { whens, otherwise })
}

fn split_overrides(raw: Option<&String>) -> Vec<String> {
    match raw {
        None => vec![],
        Some(s) => s.split(',').map(|part| part.trim().to_string()).filter(|part| !part.is_empty()).collect(),
    }
}

fn require_attr(tag_attrs: &IndexMap<String, String>, tag: &str, attr: &str) -> Result<String> {
    tag_attrs
        .get(attr)
        .cloned()
        .ok_or_else(|| Error::build(format!("`<{tag}>` is missing required attribute `{attr}`")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_and_if() {
        let fragments = IndexMap::new();
        let mut seen = HashSet::new();
        let nodes = parse_nodes(r#"select * from t <if test="a!=null"> where a=#{a}</if>"#, &fragments, &mut seen).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0], SqlNode::Text("select * from t ".to_string()));
        match &nodes[1] {
            SqlNode::If { test, children } => {
                assert_eq!(test, "a!=null");
                assert_eq!(children, &vec![SqlNode::Text(" where a=#{a}".to_string())]);
            }
            other => panic!("expected If node, got {other:?}"),
        }
    }

    #[test]
    fn parses_foreach_attrs() {
        let fragments = IndexMap::new();
        let mut seen = HashSet::new();
        let nodes = parse_nodes(r#"<foreach collection="ids" item="i" open="(" close=")" separator=",">#{i}</foreach>"#, &fragments, &mut seen).unwrap();
        match &nodes[0] {
            SqlNode::Foreach { collection, item, open, close, separator, .. } => {
                assert_eq!(collection, "ids");
                assert_eq!(item.as_deref(), Some("i"));
                assert_eq!(open.as_deref(), Some("("));
                assert_eq!(close.as_deref(), Some(")"));
                assert_eq!(separator.as_deref(), Some(","));
            }
            other => panic!("expected Foreach node, got {other:?}"),
        }
    }

    #[test]
    fn include_inlines_fragment_with_property_substitution() {
        let mut fragments = IndexMap::new();
        fragments.insert("cols".to_string(), "id, ${extra}".to_string());
        let mut seen = HashSet::new();
        let nodes = parse_nodes(
            r#"select <include refid="cols"><property name="extra" value="name"/></include> from t"#,
            &fragments,
            &mut seen,
        )
        .unwrap();
        assert_eq!(nodes[0], SqlNode::Text("select ".to_string()));
        match &nodes[1] {
            SqlNode::Trim { children, .. } => {
                assert_eq!(children, &vec![SqlNode::Text("id, name".to_string())]);
            }
            other => panic!("expected inlined fragment, got {other:?}"),
        }
    }

    #[test]
    fn rejects_circular_include() {
        let mut fragments = IndexMap::new();
        fragments.insert("a".to_string(), r#"<include refid="b"/>"#.to_string());
        fragments.insert("b".to_string(), r#"<include refid="a"/>"#.to_string());
        let mut seen = HashSet::new();
        assert!(parse_nodes(r#"<include refid="a"/>"#, &fragments, &mut seen).is_err());
    }
}
