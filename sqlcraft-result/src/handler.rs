//! The Result Set Handler (§4.10): turns raw, column-indexed rows into the
//! JSON object graph a mapped statement's result map describes — auto-mapped
//! scalars, nested associations/collections collapsed across repeated join
//! rows, discriminator dispatch, nested-select associations, and
//! multiple-result-set linking.
//!
//! Projected rows stay in `sqlcraft-core`'s `Value` representation (see
//! `sqlcraft-core::value`): this crate has no access to the caller's
//! concrete Rust type, only the logical `target_type` tag carried on
//! `ResultMap`. A caller one layer up (`sqlcraft` facade) deserializes the
//! returned `Value` into its real type via `serde` field binding or
//! `ConstructorResult`, using `ResultMap::constructor_mappings()` to know
//! which properties are constructor arguments.

use std::collections::HashMap;

use serde_json::{Map, Value};

use sqlcraft_config::Configuration;
use sqlcraft_core::error::{Error, Result};
use sqlcraft_core::settings::AutoMappingBehavior;
use sqlcraft_core::type_handler::{JdbcType, ValueKind};
use sqlcraft_mapping::{ResultMap, ResultMapping};

use crate::column::RawRow;

/// Implemented by the execution layer to resolve a nested-select
/// association/collection by running another mapped statement. Kept as a
/// trait here (rather than this crate depending on `sqlcraft-exec`) so the
/// dependency runs the natural way: the executor crate depends on this one,
/// not the reverse.
pub trait DeferredExecutor {
    /// Runs `statement_id` against `parameter`, returning a single object
    /// (`single = true`) or a JSON array of objects (`single = false`).
    fn resolve_nested_select(&self, statement_id: &str, parameter: Value, single: bool) -> Result<Value>;
}

/// One step navigating from a top-level result object down to a nested
/// property or collection element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    /// Steps into an object property.
    Field(String),
    /// Steps into an array element.
    Index(usize),
}

/// A nested-select association/collection whose resolution was deferred
/// rather than run inline, because its effective fetch type is lazy. This
/// is the "explicit deferred handle" Design Notes §9 calls for in place of
/// a transparent lazy-loading proxy: the caller decides if and when to
/// drain it (typically immediately, since nothing downstream can intercept
/// a later field access the way a proxy would).
#[derive(Debug, Clone)]
pub struct DeferredLoad {
    /// Index into the `results` vector this load targets.
    pub root_index: usize,
    /// Path from that root object down to the property to fill.
    pub path: Vec<PathStep>,
    /// The nested-select statement id to run.
    pub statement_id: String,
    /// The parameter object to run it with.
    pub parameter: Value,
    /// Whether the resolved value should be a single object (`true`) or a
    /// JSON array (`false`).
    pub single: bool,
}

/// Applies a resolved deferred load's value back into `results`, by
/// navigating `load.path` from `results[load.root_index]`.
pub fn apply_deferred(results: &mut [Value], load: &DeferredLoad, resolved: Value) {
    let mut current = &mut results[load.root_index];
    for step in &load.path {
        current = step_mut(current, step);
    }
    *current = resolved;
}

fn step_mut<'a>(value: &'a mut Value, step: &PathStep) -> &'a mut Value {
    match step {
        PathStep::Field(name) => value
            .as_object_mut()
            .expect("deferred load path steps into an object")
            .entry(name.clone())
            .or_insert(Value::Null),
        PathStep::Index(i) => value
            .as_array_mut()
            .expect("deferred load path steps into an array")
            .get_mut(*i)
            .expect("deferred load path index is in bounds"),
    }
}

/// Projects raw rows through a result map.
pub struct ResultSetHandler<'a> {
    configuration: &'a Configuration,
}

impl<'a> ResultSetHandler<'a> {
    /// Builds a handler reading settings/result maps/type handlers from
    /// `configuration`.
    pub fn new(configuration: &'a Configuration) -> Self {
        Self { configuration }
    }

    /// Projects `rows` through the result map named `result_map_id`,
    /// collapsing repeated parent rows from one-to-many joins and returning
    /// any nested-select loads whose fetch type is effectively lazy.
    pub fn handle_result_set(
        &self,
        rows: Vec<RawRow>,
        result_map_id: &str,
        executor: &dyn DeferredExecutor,
    ) -> Result<(Vec<Value>, Vec<DeferredLoad>)> {
        let result_map = self
            .configuration
            .result_map(result_map_id)
            .ok_or_else(|| Error::incomplete_reference("result map", result_map_id.to_string()))?;

        let mut results: Vec<Value> = Vec::new();
        let mut root_index: HashMap<String, usize> = HashMap::new();
        let mut nested_cache: HashMap<String, Vec<PathStep>> = HashMap::new();
        let mut deferred: Vec<DeferredLoad> = Vec::new();

        for row in &rows {
            let resolved_map = self.resolve_discriminated(result_map, row, None, &mut Vec::new())?;

            if row_is_suppressed(resolved_map, row, None) && !self.configuration.settings().return_instance_for_empty_row {
                continue;
            }

            let identity = identity_key(resolved_map, row, None);
            let root_idx = *root_index.entry(identity.clone()).or_insert_with(|| {
                results.push(Value::Object(Map::new()));
                results.len() - 1
            });

            self.fill_object(
                &mut results,
                root_idx,
                &mut Vec::new(),
                resolved_map,
                row,
                None,
                &mut nested_cache,
                &identity,
                &mut deferred,
                executor,
            )?;
        }

        Ok((results, deferred))
    }

    /// Links a secondary result set (§4.10 "multiple result sets") onto
    /// `parents`, via the single `ResultMapping` in `parent_result_map`
    /// whose `result_set` names `result_set_name`. Matches rows by
    /// `mapping.column` (read from the parent's own row, captured in
    /// `parent_keys`, aligned by index with `parents`) against
    /// `mapping.foreign_columns`'s unqualified entry (read from each child
    /// row).
    pub fn attach_result_set(
        &self,
        parents: &mut [Value],
        parent_keys: &[Value],
        parent_result_map: &ResultMap,
        result_set_name: &str,
        child_rows: Vec<RawRow>,
        executor: &dyn DeferredExecutor,
    ) -> Result<Vec<DeferredLoad>> {
        let mapping = parent_result_map
            .mappings
            .iter()
            .find(|m| m.result_set.as_deref() == Some(result_set_name))
            .ok_or_else(|| Error::build(format!("no mapping in `{}` claims result set `{result_set_name}`", parent_result_map.id)))?;
        let nested_map_id = mapping
            .nested_result_map
            .as_ref()
            .ok_or_else(|| Error::build(format!("result set mapping for `{}` has no nested result map", mapping.property)))?;
        let foreign_column = mapping
            .foreign_columns
            .get("")
            .or_else(|| mapping.foreign_columns.values().next())
            .cloned()
            .ok_or_else(|| Error::build(format!("result set mapping for `{}` has no foreignColumn", mapping.property)))?;

        let mut deferred = Vec::new();
        let mut grouped: HashMap<String, Vec<Value>> = HashMap::new();
        for row in child_rows {
            let key = row.get(&foreign_column).cloned().unwrap_or(Value::Null);
            let (mut objects, mut more) = self.handle_result_set(vec![row], nested_map_id, executor)?;
            deferred.append(&mut more);
            grouped.entry(canonical_repr(&key)).or_default().append(&mut objects);
        }

        for (parent, key) in parents.iter_mut().zip(parent_keys) {
            let Some(children) = grouped.get(&canonical_repr(key)) else {
                continue;
            };
            let value = if mapping.of_type.is_some() {
                Value::Array(children.clone())
            } else if let Some(first) = children.first() {
                first.clone()
            } else {
                continue;
            };
            if let Some(obj) = parent.as_object_mut() {
                obj.insert(mapping.property.clone(), value);
            }
        }
        Ok(deferred)
    }

    fn resolve_discriminated<'m>(
        &self,
        map: &'m ResultMap,
        row: &RawRow,
        column_prefix: Option<&str>,
        visited: &mut Vec<String>,
    ) -> Result<&'m ResultMap> {
        let Some(discriminator) = &map.discriminator else {
            return Ok(map);
        };
        if visited.contains(&map.id) {
            return Err(Error::build(format!("discriminator cycle detected at result map `{}`", map.id)));
        }
        visited.push(map.id.clone());

        let raw = row.get_prefixed(&discriminator.column, column_prefix);
        let key = raw.map(canonical_repr).unwrap_or_default();
        let Some(case_id) = discriminator.cases.get(&key) else {
            return Ok(map);
        };
        let case_map = self
            .configuration
            .result_map(case_id)
            .ok_or_else(|| Error::incomplete_reference("result map", case_id.clone()))?;
        self.resolve_discriminated(case_map, row, column_prefix, visited)
    }

    #[allow(clippy::too_many_arguments)]
    fn fill_object(
        &self,
        results: &mut Vec<Value>,
        root_idx: usize,
        path: &mut Vec<PathStep>,
        result_map: &ResultMap,
        row: &RawRow,
        column_prefix: Option<&str>,
        nested_cache: &mut HashMap<String, Vec<PathStep>>,
        root_identity: &str,
        deferred: &mut Vec<DeferredLoad>,
        executor: &dyn DeferredExecutor,
    ) -> Result<()> {
        let settings = self.configuration.settings();
        let auto_map = match result_map.auto_mapping.map(|b| if b { AutoMappingBehavior::Full } else { AutoMappingBehavior::None }) {
            Some(behavior) => behavior,
            None => settings.auto_mapping_behavior,
        };
        let has_nested = result_map.mappings.iter().any(|m| m.is_nested());
        let auto_map_applies = match auto_map {
            AutoMappingBehavior::None => false,
            AutoMappingBehavior::Partial => !has_nested,
            AutoMappingBehavior::Full => true,
        };

        let mut covered: Vec<String> = Vec::new();

        for mapping in &result_map.mappings {
            if mapping.result_set.is_some() {
                continue;
            }
            if mapping.is_nested() {
                self.fill_nested(
                    results, root_idx, path, mapping, row, column_prefix, nested_cache, root_identity, deferred, executor,
                )?;
                continue;
            }
            let Some(column) = &mapping.column else { continue };
            covered.push(column.to_ascii_lowercase());
            let raw = row.get_prefixed(column, column_prefix).cloned().unwrap_or(Value::Null);
            let converted = self.convert(&raw, mapping.value_kind, mapping.jdbc_type)?;
            let target = navigate_mut(results, root_idx, path);
            target
                .as_object_mut()
                .expect("nested containers are always objects")
                .insert(mapping.property.clone(), converted);
        }

        if auto_map_applies {
            for column_name in row.columns().names() {
                let effective = strip_prefix(column_name, column_prefix);
                if covered.contains(&effective.to_ascii_lowercase()) {
                    continue;
                }
                let property = to_property_name(effective, settings.map_underscore_to_camel_case);
                let raw = row.get_prefixed(effective, column_prefix).cloned().unwrap_or(Value::Null);
                let target = navigate_mut(results, root_idx, path);
                let obj = target.as_object_mut().expect("nested containers are always objects");
                obj.entry(property).or_insert(raw);
            }
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn fill_nested(
        &self,
        results: &mut Vec<Value>,
        root_idx: usize,
        path: &mut Vec<PathStep>,
        mapping: &ResultMapping,
        row: &RawRow,
        column_prefix: Option<&str>,
        nested_cache: &mut HashMap<String, Vec<PathStep>>,
        root_identity: &str,
        deferred: &mut Vec<DeferredLoad>,
        executor: &dyn DeferredExecutor,
    ) -> Result<()> {
        if !not_null_columns_present(&mapping.not_null_columns, row, column_prefix) {
            return Ok(());
        }

        if let Some(nested_id) = &mapping.nested_result_map {
            let nested_map = self
                .configuration
                .result_map(nested_id)
                .ok_or_else(|| Error::incomplete_reference("result map", nested_id.clone()))?;
            let nested_prefix = mapping.column_prefix.clone().or_else(|| column_prefix.map(str::to_string));
            let resolved = self.resolve_discriminated(nested_map, row, nested_prefix.as_deref(), &mut Vec::new())?;

            if row_is_suppressed(resolved, row, nested_prefix.as_deref()) {
                return Ok(());
            }
            let nested_identity = identity_key(resolved, row, nested_prefix.as_deref());
            let cache_key = format!("{root_identity}|{:?}|{}|{nested_identity}", path, mapping.property);

            let child_path = if let Some(existing) = nested_cache.get(&cache_key) {
                existing.clone()
            } else if mapping.of_type.is_some() {
                let container = navigate_mut(results, root_idx, path);
                let obj = container.as_object_mut().expect("nested containers are always objects");
                let array = obj.entry(mapping.property.clone()).or_insert_with(|| Value::Array(Vec::new()));
                let array = array.as_array_mut().expect("collection mapping targets a json array");
                array.push(Value::Object(Map::new()));
                let index = array.len() - 1;
                let mut child_path = path.clone();
                child_path.push(PathStep::Field(mapping.property.clone()));
                child_path.push(PathStep::Index(index));
                nested_cache.insert(cache_key, child_path.clone());
                child_path
            } else {
                let container = navigate_mut(results, root_idx, path);
                let obj = container.as_object_mut().expect("nested containers are always objects");
                obj.entry(mapping.property.clone()).or_insert_with(|| Value::Object(Map::new()));
                let mut child_path = path.clone();
                child_path.push(PathStep::Field(mapping.property.clone()));
                nested_cache.insert(cache_key, child_path.clone());
                child_path
            };

            let mut child_path = child_path;
            self.fill_object(
                results,
                root_idx,
                &mut child_path,
                resolved,
                row,
                nested_prefix.as_deref(),
                nested_cache,
                root_identity,
                deferred,
                executor,
            )?;
            return Ok(());
        }

        if let Some(statement_id) = &mapping.nested_select {
            let parameter = nested_select_parameter(mapping, row, column_prefix);
            let effective_eager = match mapping.fetch_type {
                sqlcraft_mapping::FetchType::Eager => true,
                sqlcraft_mapping::FetchType::Lazy => false,
                sqlcraft_mapping::FetchType::Default => !self.configuration.settings().lazy_loading_enabled,
            };
            let single = mapping.of_type.is_none();
            if effective_eager {
                let resolved = executor.resolve_nested_select(statement_id, parameter, single)?;
                let target = navigate_mut(results, root_idx, path);
                target
                    .as_object_mut()
                    .expect("nested containers are always objects")
                    .insert(mapping.property.clone(), resolved);
            } else {
                let mut load_path = path.clone();
                load_path.push(PathStep::Field(mapping.property.clone()));
                deferred.push(DeferredLoad {
                    root_index: root_idx,
                    path: load_path,
                    statement_id: statement_id.clone(),
                    parameter,
                    single,
                });
            }
        }

        Ok(())
    }

    fn convert(&self, raw: &Value, value_kind: Option<ValueKind>, jdbc_type: Option<JdbcType>) -> Result<Value> {
        if raw.is_null() {
            return Ok(Value::Null);
        }
        let kind = value_kind.unwrap_or_else(|| infer_value_kind(raw));
        let handler = self.configuration.type_handlers().resolve(kind, jdbc_type)?;
        handler.get_result(raw)
    }
}

fn navigate_mut<'a>(results: &'a mut [Value], root_idx: usize, path: &[PathStep]) -> &'a mut Value {
    let mut current = &mut results[root_idx];
    for step in path {
        current = step_mut(current, step);
    }
    current
}

fn infer_value_kind(value: &Value) -> ValueKind {
    match value {
        Value::Bool(_) => ValueKind::Bool,
        Value::Number(n) if n.is_i64() || n.is_u64() => ValueKind::I64,
        Value::Number(_) => ValueKind::F64,
        Value::String(_) => ValueKind::Str,
        _ => ValueKind::Other,
    }
}

fn canonical_repr(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn strip_prefix<'a>(column: &'a str, prefix: Option<&str>) -> &'a str {
    match prefix {
        Some(p) if column.len() > p.len() && column[..p.len()].eq_ignore_ascii_case(p) => &column[p.len()..],
        _ => column,
    }
}

fn to_property_name(column: &str, underscore_to_camel_case: bool) -> String {
    if !underscore_to_camel_case {
        return column.to_string();
    }
    let mut out = String::with_capacity(column.len());
    let mut upper_next = false;
    for ch in column.chars() {
        if ch == '_' {
            upper_next = true;
            continue;
        }
        if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

fn identity_key(result_map: &ResultMap, row: &RawRow, column_prefix: Option<&str>) -> String {
    let mut parts: Vec<String> = result_map
        .id_mappings()
        .filter_map(|m| m.column.as_deref())
        .map(|c| row.get_prefixed(c, column_prefix).map(canonical_repr).unwrap_or_default())
        .collect();
    if parts.is_empty() {
        parts = result_map
            .mappings
            .iter()
            .filter(|m| !m.is_nested())
            .filter_map(|m| m.column.as_deref())
            .map(|c| row.get_prefixed(c, column_prefix).map(canonical_repr).unwrap_or_default())
            .collect();
    }
    format!("{}:{}", result_map.id, parts.join("\u{1}"))
}

fn row_is_suppressed(result_map: &ResultMap, row: &RawRow, column_prefix: Option<&str>) -> bool {
    result_map
        .mappings
        .iter()
        .filter(|m| !m.is_nested())
        .filter_map(|m| m.column.as_deref())
        .all(|c| row.get_prefixed(c, column_prefix).map(Value::is_null).unwrap_or(true))
}

fn not_null_columns_present(columns: &[String], row: &RawRow, column_prefix: Option<&str>) -> bool {
    columns.iter().all(|c| row.get_prefixed(c, column_prefix).map(|v| !v.is_null()).unwrap_or(false))
}

fn nested_select_parameter(mapping: &ResultMapping, row: &RawRow, column_prefix: Option<&str>) -> Value {
    if mapping.foreign_columns.is_empty() {
        return mapping
            .column
            .as_deref()
            .and_then(|c| row.get_prefixed(c, column_prefix))
            .cloned()
            .unwrap_or(Value::Null);
    }
    if let Some(single) = mapping.foreign_columns.get("") {
        return row.get_prefixed(single, column_prefix).cloned().unwrap_or(Value::Null);
    }
    let mut map = Map::new();
    for (column, param_name) in &mapping.foreign_columns {
        let value = row.get_prefixed(column, column_prefix).cloned().unwrap_or(Value::Null);
        map.insert(param_name.clone(), value);
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnMeta, ColumnSet};
    use serde_json::json;
    use sqlcraft_config::ConfigurationBuilder;
    use sqlcraft_core::type_handler::TypeHandlerRegistry;
    use std::sync::Arc;

    struct NoNestedSelects;
    impl DeferredExecutor for NoNestedSelects {
        fn resolve_nested_select(&self, _statement_id: &str, _parameter: Value, _single: bool) -> Result<Value> {
            panic!("no nested select expected in this test")
        }
    }

    fn configuration_with_mapper(xml: &str) -> Configuration {
        let mut builder = ConfigurationBuilder::new(None, TypeHandlerRegistry::with_builtins());
        builder.add_mapper_document(xml).unwrap();
        builder.build().unwrap()
    }

    fn row(columns: &[&str], values: Vec<Value>) -> RawRow {
        let columns = Arc::new(ColumnSet::new(columns.iter().map(|c| ColumnMeta::new(*c)).collect(), true));
        RawRow::new(columns, values)
    }

    #[test]
    fn flat_result_map_projects_scalar_columns() {
        let config = configuration_with_mapper(
            r#"<mapper namespace="Users">
                <resultMap id="user" type="User">
                    <id property="id" column="id"/>
                    <result property="name" column="name"/>
                </resultMap>
            </mapper>"#,
        );
        let handler = ResultSetHandler::new(&config);
        let rows = vec![row(&["id", "name"], vec![json!(1), json!("ada")])];
        let (results, deferred) = handler.handle_result_set(rows, "Users.user", &NoNestedSelects).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["id"], json!(1));
        assert_eq!(results[0]["name"], json!("ada"));
        assert!(deferred.is_empty());
    }

    #[test]
    fn nested_collection_collapses_repeated_parent_rows() {
        let config = configuration_with_mapper(
            r#"<mapper namespace="Orders">
                <resultMap id="item" type="Item">
                    <id property="id" column="item_id"/>
                    <result property="sku" column="item_sku"/>
                </resultMap>
                <resultMap id="order" type="Order">
                    <id property="id" column="order_id"/>
                    <collection property="items" resultMap="Orders.item"/>
                </resultMap>
            </mapper>"#,
        );
        let handler = ResultSetHandler::new(&config);
        let rows = vec![
            row(&["order_id", "item_id", "item_sku"], vec![json!(1), json!(10), json!("a")]),
            row(&["order_id", "item_id", "item_sku"], vec![json!(1), json!(11), json!("b")]),
            row(&["order_id", "item_id", "item_sku"], vec![json!(2), json!(12), json!("c")]),
        ];
        let (results, _) = handler.handle_result_set(rows, "Orders.order", &NoNestedSelects).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["items"].as_array().unwrap().len(), 2);
        assert_eq!(results[0]["items"][0]["sku"], json!("a"));
        assert_eq!(results[1]["items"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn discriminator_dispatches_to_matching_case() {
        let config = configuration_with_mapper(
            r#"<mapper namespace="Vehicles">
                <resultMap id="car" type="Car">
                    <id property="id" column="id"/>
                    <result property="doors" column="doors"/>
                </resultMap>
                <resultMap id="truck" type="Truck">
                    <id property="id" column="id"/>
                    <result property="payload" column="payload"/>
                </resultMap>
                <resultMap id="base" type="Vehicle">
                    <id property="id" column="id"/>
                    <discriminator column="kind">
                        <case value="car" resultMap="Vehicles.car"/>
                        <case value="truck" resultMap="Vehicles.truck"/>
                    </discriminator>
                </resultMap>
            </mapper>"#,
        );
        let handler = ResultSetHandler::new(&config);
        let rows = vec![
            row(&["id", "kind", "doors", "payload"], vec![json!(1), json!("car"), json!(4), Value::Null]),
            row(&["id", "kind", "doors", "payload"], vec![json!(2), json!("truck"), Value::Null, json!(1000)]),
        ];
        let (results, _) = handler.handle_result_set(rows, "Vehicles.base", &NoNestedSelects).unwrap();
        assert_eq!(results[0]["doors"], json!(4));
        assert_eq!(results[1]["payload"], json!(1000));
    }

    #[test]
    fn auto_mapping_fills_unmapped_columns_by_name() {
        let config = configuration_with_mapper(
            r#"<mapper namespace="Users">
                <resultMap id="user" type="User">
                    <id property="id" column="id"/>
                </resultMap>
            </mapper>"#,
        );
        let handler = ResultSetHandler::new(&config);
        let rows = vec![row(&["id", "email"], vec![json!(1), json!("a@example.com")])];
        let (results, _) = handler.handle_result_set(rows, "Users.user", &NoNestedSelects).unwrap();
        assert_eq!(results[0]["email"], json!("a@example.com"));
    }

    #[test]
    fn entirely_null_row_produces_no_object() {
        let config = configuration_with_mapper(
            r#"<mapper namespace="Users">
                <resultMap id="user" type="User">
                    <id property="id" column="id"/>
                    <result property="name" column="name"/>
                </resultMap>
            </mapper>"#,
        );
        let handler = ResultSetHandler::new(&config);
        let rows = vec![row(&["id", "name"], vec![Value::Null, Value::Null])];
        let (results, _) = handler.handle_result_set(rows, "Users.user", &NoNestedSelects).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn lazy_nested_select_is_deferred_rather_than_resolved_inline() {
        let config = configuration_with_mapper(
            r#"<mapper namespace="Orders">
                <resultMap id="order" type="Order">
                    <id property="id" column="id"/>
                    <association property="customer" select="Customers.selectById" column="customer_id" fetchType="lazy"/>
                </resultMap>
            </mapper>"#,
        );
        let handler = ResultSetHandler::new(&config);
        let rows = vec![row(&["id", "customer_id"], vec![json!(1), json!(9)])];
        let (results, deferred) = handler.handle_result_set(rows, "Orders.order", &NoNestedSelects).unwrap();
        assert!(results[0].get("customer").is_none());
        assert_eq!(deferred.len(), 1);
        assert_eq!(deferred[0].statement_id, "Customers.selectById");
        assert_eq!(deferred[0].parameter, json!(9));
    }
}
