//! The top-level `<configuration>` document (§6): `<properties>`,
//! `<settings>`, `<environments>`, `<databaseIdProvider>`, and the list of
//! `<mappers>` resources to load. Resource loading (turning a `<mapper
//! resource=...>` reference into XML text) is the caller's responsibility —
//! this module only records what was referenced.

use indexmap::IndexMap;
use quick_xml::events::Event;
use quick_xml::Reader;

use sqlcraft_core::error::{Error, Result};
use sqlcraft_core::settings::Settings;

use crate::database_id::DatabaseIdProvider;
use crate::environment::{Environment, Environments, PluggableSpec};
use crate::settings_doc::build_settings;
use crate::xml::{attrs, local_name, read_inner_xml, skip_to_end, substitute_properties};

/// One `<mapper>` reference inside `<mappers>`: exactly one of `resource`,
/// `url`, or `class` is populated, mirroring the mutually exclusive
/// attributes on the element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapperReference {
    /// A classpath-relative XML resource path.
    Resource(String),
    /// A URL to an XML document.
    Url(String),
    /// An interface type name, registered without a separate XML document
    /// (annotation-style mapping is out of scope; this records the
    /// reference so callers can still bind interface descriptors to it).
    Class(String),
}

/// The parsed `<configuration>` document, before any mapper documents have
/// been folded in.
#[derive(Debug, Default)]
pub struct ConfigDocument {
    /// `<properties>` entries, already self-substituted against a
    /// `resource`/`url`-loaded properties file if one was named (the caller
    /// supplies that file's contents via `external_properties`).
    pub properties: IndexMap<String, String>,
    /// The effective settings after applying `<settings>` over the defaults.
    pub settings: Settings,
    /// Configured environments.
    pub environments: Environments,
    /// The configured database id provider, if any.
    pub database_id_provider: Option<DatabaseIdProvider>,
    /// `<mappers>` entries, in declaration order.
    pub mapper_references: Vec<MapperReference>,
}

/// Parses a `<configuration>` document. `external_properties` supplies the
/// contents of a `<properties resource=.../>`-referenced file, if the
/// document names one; its entries are merged in before the document's own
/// inline `<property>` children, which take precedence (matching
/// declaration order: file first, inline overrides after).
pub fn parse_config_document(xml: &str, external_properties: IndexMap<String, String>) -> Result<ConfigDocument> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if local_name(&e) == "configuration" => break,
            Ok(Event::Eof) => return Err(Error::build("configuration document has no `<configuration>` root element")),
            Ok(_) => {}
            Err(e) => return Err(Error::build(format!("xml error: {e}"))),
        }
    }

    let mut doc = ConfigDocument::default();
    let mut settings_pairs = IndexMap::new();
    let mut have_settings = false;

    loop {
        match reader.read_event() {
            Ok(Event::Eof) => return Err(Error::build("unterminated `<configuration>` element")),
            Ok(Event::End(e)) if local_name_bytes(&e) == "configuration" => break,
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                let tag_attrs = attrs(&e)?;
                match name.as_str() {
                    "properties" => {
                        doc.properties = external_properties.clone();
                        parse_inline_properties(&mut reader, &mut doc.properties)?;
                    }
                    "settings" => {
                        have_settings = true;
                        parse_settings(&mut reader, &mut settings_pairs)?;
                    }
                    "environments" => {
                        doc.environments = parse_environments(&mut reader, &tag_attrs, &doc.properties)?;
                    }
                    "databaseIdProvider" => {
                        doc.database_id_provider = Some(parse_database_id_provider(&mut reader, &tag_attrs)?);
                    }
                    "mappers" => {
                        doc.mapper_references = parse_mappers(&mut reader, &doc.properties)?;
                    }
                    other => {
                        skip_to_end(&mut reader, other)?;
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(&e);
                if name == "properties" {
                    doc.properties = external_properties.clone();
                }
            }
            Ok(_) => {}
            Err(e) => return Err(Error::build(format!("xml error: {e}"))),
        }
    }

    doc.settings = if have_settings { build_settings(settings_pairs)? } else { Settings::default() };
    Ok(doc)
}

fn local_name_bytes(e: &quick_xml::events::BytesEnd<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn parse_inline_properties(reader: &mut Reader<&[u8]>, properties: &mut IndexMap<String, String>) -> Result<()> {
    loop {
        match reader.read_event() {
            Ok(Event::End(e)) if local_name_bytes(&e) == "properties" => return Ok(()),
            Ok(Event::Empty(e)) if local_name(&e) == "property" => {
                let tag_attrs = attrs(&e)?;
                let name = required(&tag_attrs, "property", "name")?;
                let value = required(&tag_attrs, "property", "value")?;
                properties.insert(name, value);
            }
            Ok(Event::Eof) => return Err(Error::build("unterminated `<properties>` element")),
            Err(e) => return Err(Error::build(format!("xml error: {e}"))),
            _ => {}
        }
    }
}

fn parse_settings(reader: &mut Reader<&[u8]>, pairs: &mut IndexMap<String, String>) -> Result<()> {
    loop {
        match reader.read_event() {
            Ok(Event::End(e)) if local_name_bytes(&e) == "settings" => return Ok(()),
            Ok(Event::Empty(e)) if local_name(&e) == "setting" => {
                let tag_attrs = attrs(&e)?;
                let name = required(&tag_attrs, "setting", "name")?;
                let value = required(&tag_attrs, "setting", "value")?;
                pairs.insert(name, value);
            }
            Ok(Event::Eof) => return Err(Error::build("unterminated `<settings>` element")),
            Err(e) => return Err(Error::build(format!("xml error: {e}"))),
            _ => {}
        }
    }
}

fn parse_environments(reader: &mut Reader<&[u8]>, tag_attrs: &IndexMap<String, String>, properties: &IndexMap<String, String>) -> Result<Environments> {
    let mut environments = Environments::new();
    environments.default = tag_attrs.get("default").cloned();
    loop {
        match reader.read_event() {
            Ok(Event::End(e)) if local_name_bytes(&e) == "environments" => return Ok(environments),
            Ok(Event::Start(e)) if local_name(&e) == "environment" => {
                let env_attrs = attrs(&e)?;
                let id = required(&env_attrs, "environment", "id")?;
                let inner = read_inner_xml(reader, "environment")?;
                let env = parse_environment(&id, &inner, properties)?;
                environments.list.insert(id, env);
            }
            Ok(Event::Eof) => return Err(Error::build("unterminated `<environments>` element")),
            Err(e) => return Err(Error::build(format!("xml error: {e}"))),
            _ => {}
        }
    }
}

fn parse_environment(id: &str, inner: &str, properties: &IndexMap<String, String>) -> Result<Environment> {
    let mut reader = Reader::from_str(inner);
    reader.trim_text(true);
    let mut transaction_manager = None;
    let mut data_source = None;
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Empty(e)) => {
                let name = local_name(&e);
                let tag_attrs = attrs(&e)?;
                let kind = required(&tag_attrs, &name, "type")?;
                assign_pluggable(&name, PluggableSpec::new(kind), &mut transaction_manager, &mut data_source)?;
            }
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                let tag_attrs = attrs(&e)?;
                let kind = required(&tag_attrs, &name, "type")?;
                let mut spec = PluggableSpec::new(kind);
                spec.properties = parse_pluggable_properties(&mut reader, &name, properties)?;
                assign_pluggable(&name, spec, &mut transaction_manager, &mut data_source)?;
            }
            Ok(_) => {}
            Err(e) => return Err(Error::build(format!("xml error: {e}"))),
        }
    }
    Ok(Environment {
        id: id.to_string(),
        transaction_manager: transaction_manager.ok_or_else(|| Error::build("`<environment>` is missing `<transactionManager>`"))?,
        data_source: data_source.ok_or_else(|| Error::build("`<environment>` is missing `<dataSource>`"))?,
    })
}

fn assign_pluggable(name: &str, spec: PluggableSpec, transaction_manager: &mut Option<PluggableSpec>, data_source: &mut Option<PluggableSpec>) -> Result<()> {
    match name {
        "transactionManager" => {
            *transaction_manager = Some(spec);
            Ok(())
        }
        "dataSource" => {
            *data_source = Some(spec);
            Ok(())
        }
        other => Err(Error::build(format!("unrecognized environment child `{other}`"))),
    }
}

fn parse_pluggable_properties(reader: &mut Reader<&[u8]>, tag: &str, properties: &IndexMap<String, String>) -> Result<IndexMap<String, String>> {
    let mut props = IndexMap::new();
    loop {
        match reader.read_event() {
            Ok(Event::End(end)) if local_name_bytes(&end) == tag => break,
            Ok(Event::Empty(p)) if local_name(&p) == "property" => {
                let prop_attrs = attrs(&p)?;
                let name = required(&prop_attrs, "property", "name")?;
                let raw = required(&prop_attrs, "property", "value")?;
                props.insert(name, substitute_properties(&raw, properties));
            }
            Ok(Event::Eof) => return Err(Error::build(format!("unterminated `<{tag}>` element"))),
            Err(err) => return Err(Error::build(format!("xml error: {err}"))),
            _ => {}
        }
    }
    Ok(props)
}

fn parse_database_id_provider(reader: &mut Reader<&[u8]>, tag_attrs: &IndexMap<String, String>) -> Result<DatabaseIdProvider> {
    let kind = tag_attrs.get("type").cloned().unwrap_or_else(|| "DB_VENDOR".to_string());
    let mut props = IndexMap::new();
    loop {
        match reader.read_event() {
            Ok(Event::End(e)) if local_name_bytes(&e) == "databaseIdProvider" => break,
            Ok(Event::Empty(e)) if local_name(&e) == "property" => {
                let prop_attrs = attrs(&e)?;
                let name = required(&prop_attrs, "property", "name")?;
                let value = required(&prop_attrs, "property", "value")?;
                props.insert(name, value);
            }
            Ok(Event::Eof) => return Err(Error::build("unterminated `<databaseIdProvider>` element")),
            Err(e) => return Err(Error::build(format!("xml error: {e}"))),
            _ => {}
        }
    }
    if kind != "DB_VENDOR" {
        return Err(Error::build(format!("unsupported databaseIdProvider type `{kind}`")));
    }
    Ok(DatabaseIdProvider::db_vendor(props))
}

fn parse_mappers(reader: &mut Reader<&[u8]>, properties: &IndexMap<String, String>) -> Result<Vec<MapperReference>> {
    let mut out = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::End(e)) if local_name_bytes(&e) == "mappers" => return Ok(out),
            Ok(Event::Empty(e)) if local_name(&e) == "mapper" => {
                let tag_attrs = attrs(&e)?;
                out.push(parse_mapper_reference(&tag_attrs, properties)?);
            }
            Ok(Event::Start(e)) if local_name(&e) == "package" => {
                skip_to_end(reader, "package")?;
            }
            Ok(Event::Empty(e)) if local_name(&e) == "package" => {
                let _ = e;
            }
            Ok(Event::Eof) => return Err(Error::build("unterminated `<mappers>` element")),
            Err(e) => return Err(Error::build(format!("xml error: {e}"))),
            _ => {}
        }
    }
}

fn parse_mapper_reference(tag_attrs: &IndexMap<String, String>, properties: &IndexMap<String, String>) -> Result<MapperReference> {
    if let Some(resource) = tag_attrs.get("resource") {
        return Ok(MapperReference::Resource(substitute_properties(resource, properties)));
    }
    if let Some(url) = tag_attrs.get("url") {
        return Ok(MapperReference::Url(substitute_properties(url, properties)));
    }
    if let Some(class) = tag_attrs.get("class") {
        return Ok(MapperReference::Class(class.clone()));
    }
    Err(Error::build("`<mapper>` must declare one of `resource`, `url`, or `class`"))
}

fn required(tag_attrs: &IndexMap<String, String>, tag: &str, attr: &str) -> Result<String> {
    tag_attrs
        .get(attr)
        .cloned()
        .ok_or_else(|| Error::build(format!("`<{tag}>` is missing required attribute `{attr}`")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_properties_settings_and_environment() {
        let xml = r#"
            <configuration>
                <properties>
                    <property name="driver" value="org.sqlite.JDBC"/>
                </properties>
                <settings>
                    <setting name="cacheEnabled" value="false"/>
                </settings>
                <environments default="dev">
                    <environment id="dev">
                        <transactionManager type="JDBC"/>
                        <dataSource type="POOLED">
                            <property name="driver" value="${driver}"/>
                        </dataSource>
                    </environment>
                </environments>
                <mappers>
                    <mapper resource="mappers/Users.xml"/>
                </mappers>
            </configuration>
        "#;
        let doc = parse_config_document(xml, IndexMap::new()).unwrap();
        assert_eq!(doc.properties.get("driver"), Some(&"org.sqlite.JDBC".to_string()));
        assert!(!doc.settings.cache_enabled);
        assert_eq!(doc.environments.default.as_deref(), Some("dev"));
        let env = doc.environments.active().unwrap();
        assert_eq!(env.transaction_manager.kind, "JDBC");
        assert_eq!(env.data_source.properties.get("driver"), Some(&"org.sqlite.JDBC".to_string()));
        assert_eq!(doc.mapper_references, vec![MapperReference::Resource("mappers/Users.xml".to_string())]);
    }

    #[test]
    fn parses_database_id_provider() {
        let xml = r#"
            <configuration>
                <databaseIdProvider type="DB_VENDOR">
                    <property name="MySQL" value="mysql"/>
                    <property name="_default" value="generic"/>
                </databaseIdProvider>
            </configuration>
        "#;
        let doc = parse_config_document(xml, IndexMap::new()).unwrap();
        let provider = doc.database_id_provider.unwrap();
        assert_eq!(provider.resolve("MySQL Server"), Some("mysql".to_string()));
    }

    #[test]
    fn defaults_settings_when_absent() {
        let xml = "<configuration></configuration>";
        let doc = parse_config_document(xml, IndexMap::new()).unwrap();
        assert_eq!(doc.settings, Settings::default());
    }
}
