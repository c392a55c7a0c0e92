//! Small helpers over `quick_xml`'s pull parser, shared by the
//! configuration-document and mapper-document readers.

use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use sqlcraft_core::error::{Error, Result};

/// Reads every attribute of a start/empty tag into an ordered map.
pub fn attrs(tag: &BytesStart<'_>) -> Result<IndexMap<String, String>> {
    let mut out = IndexMap::new();
    for attr in tag.attributes() {
        let attr = attr.map_err(|e| Error::build(format!("malformed attribute: {e}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::build(format!("malformed attribute value: {e}")))?
            .into_owned();
        out.insert(key, value);
    }
    Ok(out)
}

/// Local (unprefixed) tag name of a start/empty tag, as a `&str`.
pub fn local_name(tag: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(tag.local_name().as_ref()).into_owned()
}

/// Reads the raw inner XML of the element just opened by `start` (the
/// reader must be positioned right after reading `start` as a `Start`
/// event), returning the exact source bytes between the open and matching
/// close tags. Used to capture `<sql>` fragment bodies and statement bodies
/// for later (possibly repeated, possibly deferred) parsing.
pub fn read_inner_xml(reader: &mut Reader<&[u8]>, tag_local_name: &str) -> Result<String> {
    let start_pos = reader.buffer_position();
    let mut depth = 1usize;
    loop {
        let before_event = reader.buffer_position();
        match reader.read_event() {
            Ok(Event::Start(e)) if local_name(&e) == tag_local_name => depth += 1,
            Ok(Event::End(e)) if local_name_bytes(&e) == tag_local_name => {
                depth -= 1;
                if depth == 0 {
                    let source = reader.get_ref();
                    let slice = &source[start_pos..before_event];
                    return Ok(String::from_utf8_lossy(slice).into_owned());
                }
            }
            Ok(Event::Eof) => return Err(Error::build(format!("unterminated element `{tag_local_name}`"))),
            Err(e) => return Err(Error::build(format!("xml error: {e}"))),
            _ => {}
        }
    }
}

fn local_name_bytes(e: &quick_xml::events::BytesEnd<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Skips to (and consumes) the matching `End` event for an element whose
/// `Start` was just read, discarding its content. Used for elements this
/// crate does not yet interpret (pluggable `objectFactory`, etc.) so
/// document ingestion doesn't choke on them.
pub fn skip_to_end(reader: &mut Reader<&[u8]>, tag_local_name: &str) -> Result<()> {
    let mut depth = 1usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if local_name(&e) == tag_local_name => depth += 1,
            Ok(Event::End(e)) if local_name_bytes(&e) == tag_local_name => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Ok(Event::Eof) => return Err(Error::build(format!("unterminated element `{tag_local_name}`"))),
            Err(e) => return Err(Error::build(format!("xml error: {e}"))),
            _ => {}
        }
    }
}

/// Substitutes `${name}` occurrences in `text` from a flat property store.
/// Unlike the dynamic-SQL `${...}` substitution (which evaluates an
/// expression against a parameter object at render time), this is a literal
/// lookup against the configuration document's `<properties>` store,
/// performed once at parse time. Unresolved names are left verbatim.
pub fn substitute_properties(text: &str, properties: &IndexMap<String, String>) -> String {
    if properties.is_empty() || !text.contains("${") {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match properties.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str("${");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_properties() {
        let mut props = IndexMap::new();
        props.insert("driver".to_string(), "org.sqlite".to_string());
        assert_eq!(substitute_properties("driver=${driver}", &props), "driver=org.sqlite");
    }

    #[test]
    fn leaves_unknown_placeholder_verbatim() {
        let props = IndexMap::new();
        assert_eq!(substitute_properties("a=${missing}", &props), "a=${missing}");
    }
}
