//! `ConfigurationBuilder` (§4.7, §9 "Cyclic result-map and cache-ref
//! graphs"): accumulates parsed mapper documents, then resolves forward
//! references (`resultMap@extends`, `cache-ref`) via a two-phase,
//! fixed-point pass before producing an immutable [`Configuration`].
//!
//! The source's runtime `parsed` guard (Design Notes, "possible source
//! bugs") becomes, here, the ownership rule that [`ConfigurationBuilder::build`]
//! consumes `self`: once built, there is no handle left to add more
//! documents to.

use indexmap::IndexMap;

use sqlcraft_core::error::{Error, Result};
use sqlcraft_core::settings::Settings;
use sqlcraft_core::type_handler::TypeHandlerRegistry;
use sqlcraft_mapping::{MappedStatement, ResultMap, ResultMapping};

use crate::configuration::Configuration;
use crate::environment::{CacheSpec, Environments};
use crate::mapper::parse_mapper_document;

/// Accumulates mapper documents and produces a [`Configuration`]. One
/// builder corresponds to one factory construction.
pub struct ConfigurationBuilder {
    active_database_id: Option<String>,
    settings: Settings,
    environments: Environments,
    type_handlers: TypeHandlerRegistry,
    shrink_whitespace: bool,
    mapped_statements: IndexMap<String, MappedStatement>,
    raw_result_maps: IndexMap<String, ResultMap>,
    caches: IndexMap<String, CacheSpec>,
    cache_refs: IndexMap<String, String>,
}

impl ConfigurationBuilder {
    /// Starts a builder. `active_database_id` is the already-resolved
    /// database id (via [`crate::database_id::DatabaseIdProvider`] against
    /// the live driver's product name, a step this crate does not itself
    /// perform since it owns no connection).
    pub fn new(active_database_id: Option<String>, type_handlers: TypeHandlerRegistry) -> Self {
        Self {
            active_database_id,
            settings: Settings::default(),
            environments: Environments::new(),
            type_handlers,
            shrink_whitespace: true,
            mapped_statements: IndexMap::new(),
            raw_result_maps: IndexMap::new(),
            caches: IndexMap::new(),
            cache_refs: IndexMap::new(),
        }
    }

    /// Applies a parsed `<configuration>` document's settings and
    /// environments. `shrinkWhitespacesInSql` takes effect immediately for
    /// mapper documents parsed afterward.
    pub fn apply_config_document(&mut self, doc: crate::config_document::ConfigDocument) {
        self.shrink_whitespace = doc.settings.shrink_whitespaces_in_sql;
        self.settings = doc.settings;
        self.environments = doc.environments;
        if let Some(provider) = doc.database_id_provider {
            if self.active_database_id.is_none() {
                if let Some(active_env) = self.environments.active() {
                    self.active_database_id = provider.resolve(&active_env.data_source.kind);
                }
            }
        }
    }

    /// Parses and installs one mapper document's namespace content.
    pub fn add_mapper_document(&mut self, xml: &str) -> Result<()> {
        let doc = parse_mapper_document(xml, self.shrink_whitespace)?;

        if let Some(cache) = doc.cache {
            self.caches.insert(doc.namespace.clone(), cache);
        }
        if let Some(target) = doc.cache_ref {
            self.cache_refs.insert(doc.namespace.clone(), target);
        }
        for result_map in doc.result_maps {
            self.raw_result_maps.insert(result_map.id.clone(), result_map);
        }
        for parsed in doc.statements {
            self.install_statement(parsed.statement);
        }
        Ok(())
    }

    /// Applies the database-id filtering and replace-only-unspecified rule
    /// (§4.7 "Database-id filtering") when inserting one statement.
    fn install_statement(&mut self, candidate: MappedStatement) {
        if let Some(candidate_id) = &candidate.database_id {
            if Some(candidate_id.as_str()) != self.active_database_id.as_deref() {
                return;
            }
        }
        let key = candidate.id.to_string();
        match self.mapped_statements.get(&key) {
            None => {
                self.mapped_statements.insert(key, candidate);
            }
            Some(existing) => match (&existing.database_id, &candidate.database_id) {
                (Some(_), None) => {}
                _ => {
                    self.mapped_statements.insert(key, candidate);
                }
            },
        }
    }

    /// Resolves `extends`/`cache-ref` forward references and produces the
    /// immutable configuration. Consumes `self`.
    pub fn build(self) -> Result<Configuration> {
        let caches = resolve_cache_refs(self.caches, self.cache_refs)?;
        let result_maps = resolve_result_map_extends(self.raw_result_maps)?;
        Ok(Configuration::new(
            self.settings,
            self.environments,
            self.active_database_id,
            self.type_handlers,
            self.mapped_statements,
            result_maps,
            caches,
        ))
    }
}

fn resolve_cache_refs(mut caches: IndexMap<String, CacheSpec>, mut pending: IndexMap<String, String>) -> Result<IndexMap<String, CacheSpec>> {
    loop {
        let mut progressed = false;
        let keys: Vec<String> = pending.keys().cloned().collect();
        for namespace in keys {
            let target = pending.get(&namespace).unwrap().clone();
            if let Some(spec) = caches.get(&target).cloned() {
                caches.insert(namespace.clone(), spec);
                pending.shift_remove(&namespace);
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
    if let Some((namespace, _)) = pending.into_iter().next() {
        return Err(Error::incomplete_reference("cache-ref", namespace));
    }
    Ok(caches)
}

fn resolve_result_map_extends(raw: IndexMap<String, ResultMap>) -> Result<IndexMap<String, ResultMap>> {
    let mut resolved: IndexMap<String, ResultMap> = IndexMap::new();
    let mut pending: IndexMap<String, ResultMap> = raw;

    loop {
        let mut progressed = false;
        let ids: Vec<String> = pending.keys().cloned().collect();
        for id in ids {
            let ready = match &pending[&id].extends {
                None => true,
                Some(base) => resolved.contains_key(base),
            };
            if !ready {
                continue;
            }
            let map = pending.shift_remove(&id).expect("id came from this map's own keys");
            let merged = merge_extends(map, &resolved)?;
            resolved.insert(id, merged);
            progressed = true;
        }
        if !progressed {
            break;
        }
    }

    if let Some((id, _)) = pending.into_iter().next() {
        return Err(Error::incomplete_reference("result map", id));
    }
    for map in resolved.values() {
        map.validate()?;
    }
    Ok(resolved)
}

fn merge_extends(mut map: ResultMap, resolved: &IndexMap<String, ResultMap>) -> Result<ResultMap> {
    let Some(base_id) = map.extends.clone() else {
        return Ok(map);
    };
    let base = resolved.get(&base_id).expect("caller only merges once the base is resolved");

    let own_properties: std::collections::HashSet<&str> = map.mappings.iter().map(|m| m.property.as_str()).collect();
    let mut inherited: Vec<ResultMapping> = base
        .mappings
        .iter()
        .filter(|m| !own_properties.contains(m.property.as_str()))
        .cloned()
        .collect();
    inherited.extend(map.mappings);
    map.mappings = inherited;

    if map.discriminator.is_none() {
        map.discriminator = base.discriminator.clone();
    }
    if map.auto_mapping.is_none() {
        map.auto_mapping = base.auto_mapping;
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::new(None, TypeHandlerRegistry::with_builtins())
    }

    #[test]
    fn installs_statements_from_a_mapper_document() {
        let xml = r#"
            <mapper namespace="Users">
                <select id="selectById" resultType="User">select * from users where id = #{id}</select>
            </mapper>
        "#;
        let mut b = builder();
        b.add_mapper_document(xml).unwrap();
        let config = b.build().unwrap();
        assert!(config.mapped_statement("Users.selectById").is_some());
    }

    #[test]
    fn resolves_result_map_extends_across_documents() {
        let base_xml = r#"
            <mapper namespace="Base">
                <resultMap id="base" type="Entity">
                    <id property="id" column="id"/>
                </resultMap>
            </mapper>
        "#;
        let child_xml = r#"
            <mapper namespace="Users">
                <resultMap id="user" type="User" extends="Base.base">
                    <result property="name" column="name"/>
                </resultMap>
            </mapper>
        "#;
        let mut b = builder();
        // Child document added first: extends is a genuine forward reference.
        b.add_mapper_document(child_xml).unwrap();
        b.add_mapper_document(base_xml).unwrap();
        let config = b.build().unwrap();
        let user_map = config.result_map("Users.user").unwrap();
        assert_eq!(user_map.mappings.len(), 2);
        assert!(user_map.mappings.iter().any(|m| m.property == "id"));
    }

    #[test]
    fn unresolved_extends_fails_at_build() {
        let xml = r#"
            <mapper namespace="Users">
                <resultMap id="user" type="User" extends="Missing.base">
                    <result property="name" column="name"/>
                </resultMap>
            </mapper>
        "#;
        let mut b = builder();
        b.add_mapper_document(xml).unwrap();
        assert!(b.build().is_err());
    }

    #[test]
    fn database_id_filtering_prefers_specific_over_unspecified() {
        let generic = r#"
            <mapper namespace="Users">
                <select id="count" resultType="long">select count(*) from users</select>
            </mapper>
        "#;
        let mysql_specific = r#"
            <mapper namespace="Users">
                <select id="count" databaseId="mysql" resultType="long">select count(*) from users /* mysql */</select>
            </mapper>
        "#;
        let mut b = ConfigurationBuilder::new(Some("mysql".to_string()), TypeHandlerRegistry::with_builtins());
        b.add_mapper_document(generic).unwrap();
        b.add_mapper_document(mysql_specific).unwrap();
        let config = b.build().unwrap();
        let statement = config.mapped_statement("Users.count").unwrap();
        assert_eq!(statement.database_id.as_deref(), Some("mysql"));
    }

    #[test]
    fn specific_statement_is_never_displaced_by_unspecified() {
        let mysql_specific = r#"
            <mapper namespace="Users">
                <select id="count" databaseId="mysql" resultType="long">select count(*) from users /* mysql */</select>
            </mapper>
        "#;
        let generic = r#"
            <mapper namespace="Users">
                <select id="count" resultType="long">select count(*) from users</select>
            </mapper>
        "#;
        let mut b = ConfigurationBuilder::new(Some("mysql".to_string()), TypeHandlerRegistry::with_builtins());
        b.add_mapper_document(mysql_specific).unwrap();
        b.add_mapper_document(generic).unwrap();
        let config = b.build().unwrap();
        let statement = config.mapped_statement("Users.count").unwrap();
        assert_eq!(statement.database_id.as_deref(), Some("mysql"));
    }
}
