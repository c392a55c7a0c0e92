//! Executor Stack (§4.8): one [`BaseExecutor`] shared by all three variants
//! (Simple/Reuse/Batch), since the only thing that differs between them is
//! how (and when) a write actually reaches the connection — the first-level
//! cache, second-level cache hookup point, and deferred-load plumbing are
//! identical. Grounded on `other_examples/0fc7f02b_uporm-uorm__src-executor-mapper.rs`'s
//! executor/mapper split and `other_examples/c95959e5_..._yachtSQL-executor-src-async_executor.rs`
//! for an executor owning a connection plus a plan/result cache.

use std::cell::RefCell;
use std::collections::HashMap;

use serde_json::Value;

use sqlcraft_config::Configuration;
use sqlcraft_core::error::Result;
use sqlcraft_core::settings::LocalCacheScope;
use sqlcraft_mapping::{CacheKey, MappedStatement};
use sqlcraft_result::{apply_deferred, DeferredExecutor, DeferredLoad, RawRow, ResultSetHandler};

use crate::connection::{Connection, UpdateResult};
use crate::statement_handler::bind_statement;

/// Offset/limit applied to a query's rows, honored in-memory unless the
/// driver boundary is trusted to push them down (`safeRowBoundsEnabled`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowBounds {
    /// Rows to skip.
    pub offset: i64,
    /// Rows to keep after skipping, or `-1` for unbounded.
    pub limit: i64,
}

impl Default for RowBounds {
    fn default() -> Self {
        Self { offset: 0, limit: -1 }
    }
}

impl RowBounds {
    /// Applies `self` to `rows`, slicing in-memory.
    pub fn apply(&self, rows: Vec<Value>) -> Vec<Value> {
        if self.offset == 0 && self.limit < 0 {
            return rows;
        }
        let offset = self.offset.max(0) as usize;
        let iter = rows.into_iter().skip(offset);
        if self.limit < 0 {
            iter.collect()
        } else {
            iter.take(self.limit as usize).collect()
        }
    }
}

/// Which of the three executor variants a `BaseExecutor` behaves as.
#[derive(Debug)]
enum Strategy {
    /// Each call prepares and closes a statement; no reuse bookkeeping.
    Simple,
    /// Tracks which SQL texts have already been seen this session, purely
    /// for instrumentation — prepared-statement handle reuse itself lives
    /// below the minimal [`Connection`] seam this workspace models, which
    /// never exposes a handle to hold onto.
    Reuse { seen_sql: std::collections::HashSet<String> },
    /// Queues writes instead of running them immediately.
    Batch { queued: Vec<(MappedStatement, Value)> },
}

/// The common executor base: owns the connection, the first-level cache,
/// and (via `strategy`) which of the three variants it behaves as.
///
/// The connection is held behind a `RefCell`. A nested select's result row
/// may itself need another statement run (another nested select, or a
/// lazily-deferred one resolved inline since this workspace has no proxy to
/// defer to) while the row that triggered it is still being built; by the
/// time that happens the triggering statement's own connection borrow has
/// already ended, so the `RefCell` never sees two live borrows at once — see
/// [`NestedSelectRunner`].
#[derive(Debug)]
pub struct BaseExecutor {
    configuration: Configuration,
    connection: RefCell<Box<dyn Connection>>,
    local_cache: HashMap<CacheKey, Value>,
    local_cache_scope: LocalCacheScope,
    strategy: Strategy,
    closed: bool,
}

impl BaseExecutor {
    /// A Simple executor: no statement reuse, no write batching.
    pub fn simple(configuration: Configuration, connection: Box<dyn Connection>) -> Self {
        Self::new(configuration, connection, Strategy::Simple)
    }

    /// A Reuse executor: logs when the same SQL text recurs within a
    /// session.
    pub fn reuse(configuration: Configuration, connection: Box<dyn Connection>) -> Self {
        Self::new(configuration, connection, Strategy::Reuse { seen_sql: Default::default() })
    }

    /// A Batch executor: queues writes until flushed.
    pub fn batch(configuration: Configuration, connection: Box<dyn Connection>) -> Self {
        Self::new(configuration, connection, Strategy::Batch { queued: Vec::new() })
    }

    fn new(configuration: Configuration, connection: Box<dyn Connection>, strategy: Strategy) -> Self {
        let local_cache_scope = configuration.settings().local_cache_scope;
        Self {
            configuration,
            connection: RefCell::new(connection),
            local_cache: HashMap::new(),
            local_cache_scope,
            strategy,
            closed: false,
        }
    }

    fn after_statement(&mut self) {
        if self.local_cache_scope == LocalCacheScope::Statement {
            self.local_cache.clear();
        }
    }

    fn resolver(&self) -> NestedSelectRunner<'_> {
        NestedSelectRunner {
            configuration: &self.configuration,
            connection: &self.connection,
        }
    }

    /// Flushes queued batched writes (a no-op for Simple/Reuse), returning
    /// one [`UpdateResult`] per queued write, in enqueue order.
    pub fn flush_batch(&mut self) -> Result<Vec<UpdateResult>> {
        let Strategy::Batch { queued } = &mut self.strategy else {
            return Ok(Vec::new());
        };
        let pending = std::mem::take(queued);
        let mut results = Vec::with_capacity(pending.len());
        for (statement, mut parameter) in pending {
            let resolver = NestedSelectRunner {
                configuration: &self.configuration,
                connection: &self.connection,
            };
            results.push(run_update(&self.configuration, &self.connection, &statement, &mut parameter, &resolver)?);
        }
        Ok(results)
    }
}

/// The executor interface (§4.8). One instance is created per session.
/// Nested-select resolution (eager inline, or lazy resolved immediately —
/// see `DESIGN.md`) is an internal concern of each implementation; it never
/// surfaces in this trait.
pub trait Executor: std::fmt::Debug {
    /// Runs a SELECT through one result map, applying the first-level
    /// cache.
    fn query(&mut self, statement: &MappedStatement, parameter: Value, bounds: RowBounds, result_map_id: &str) -> Result<Vec<Value>>;

    /// Runs a SELECT that may return more than one result set, attaching
    /// subsequent sets onto the primary one via `resultSets`/`foreignColumn`
    /// (§4.10).
    fn query_multi(&mut self, statement: &MappedStatement, parameter: Value) -> Result<Vec<Value>>;

    /// Runs an INSERT/UPDATE/DELETE. `parameter` is mutated in place when
    /// key generation (§4.8) writes a generated key back into it — on a
    /// Batch executor, queued writes are cloned, so a key generated when
    /// the batch later flushes never reaches the caller's object.
    fn update(&mut self, statement: &MappedStatement, parameter: &mut Value) -> Result<UpdateResult>;

    /// Commits the underlying connection, clearing the first-level cache.
    fn commit(&mut self) -> Result<()>;

    /// Rolls back the underlying connection, clearing the first-level
    /// cache.
    fn rollback(&mut self) -> Result<()>;

    /// Closes the executor, flushing any pending batch first.
    fn close(&mut self);

    /// Clears the first-level cache unconditionally (e.g. after a write).
    fn clear_local_cache(&mut self);
}

impl Executor for BaseExecutor {
    fn query(&mut self, statement: &MappedStatement, parameter: Value, bounds: RowBounds, result_map_id: &str) -> Result<Vec<Value>> {
        if self.closed {
            return Err(sqlcraft_core::error::Error::execution(
                "executor is closed",
                sqlcraft_core::error::Breadcrumb::new().with_statement(statement.id.to_string()),
            ));
        }
        let bound = bind_statement(statement, &parameter)?;
        let cache_key = CacheKey::new(
            statement.id.to_string(),
            bounds.offset,
            bounds.limit,
            bound.sql.clone(),
            bound.parameter_mappings.iter().map(|m| bound.resolve_property(&m.property).cloned().unwrap_or(Value::Null)).collect(),
            self.configuration.environments().default.clone(),
        );

        if let Some(cached) = self.local_cache.get(&cache_key) {
            let rows = cached.as_array().cloned().unwrap_or_default();
            return Ok(bounds.apply(rows));
        }

        if let Strategy::Reuse { seen_sql } = &mut self.strategy {
            if !seen_sql.insert(bound.sql.clone()) {
                tracing::debug!(sql = %bound.sql, "reusing previously seen prepared statement text");
            }
        }

        let raw = self.connection.borrow_mut().query(&bound.sql, &positional_values(&self.configuration, &bound)?)?;
        let rows = to_raw_rows(&self.configuration, raw);
        let projected = self.resolver().project(rows, result_map_id)?;

        self.local_cache.insert(cache_key, Value::Array(projected.clone()));
        self.after_statement();
        Ok(bounds.apply(projected))
    }

    fn query_multi(&mut self, statement: &MappedStatement, parameter: Value) -> Result<Vec<Value>> {
        if statement.result_map_ids.is_empty() {
            return Ok(Vec::new());
        }
        let bound = bind_statement(statement, &parameter)?;
        let multi = self.connection.borrow_mut().query_multi(&bound.sql, &positional_values(&self.configuration, &bound)?)?;
        let resolver = self.resolver();

        let primary_map_id = &statement.result_map_ids[0];
        let primary_rows = multi.result_sets.first().cloned().unwrap_or_default();
        let mut results = resolver.project(to_raw_rows(&self.configuration, primary_rows), primary_map_id)?;

        let primary_map = self
            .configuration
            .result_map(primary_map_id)
            .ok_or_else(|| sqlcraft_core::error::Error::incomplete_reference("result map", primary_map_id.clone()))?;

        let handler = ResultSetHandler::new(&self.configuration);
        for (index, result_set_name) in statement.result_sets.iter().enumerate() {
            let Some(child_rows) = multi.result_sets.get(index + 1).cloned() else {
                continue;
            };
            if !primary_map.mappings.iter().any(|m| m.result_set.as_deref() == Some(result_set_name.as_str())) {
                continue;
            }
            let parent_keys = collect_parent_keys(&results, primary_map, result_set_name);
            let deferred = handler.attach_result_set(&mut results, &parent_keys, primary_map, result_set_name, to_raw_rows(&self.configuration, child_rows), &resolver)?;
            resolver.drain(&mut results, deferred)?;
        }

        self.after_statement();
        Ok(results)
    }

    fn update(&mut self, statement: &MappedStatement, parameter: &mut Value) -> Result<UpdateResult> {
        self.clear_local_cache();
        if let Strategy::Batch { queued } = &mut self.strategy {
            queued.push((statement.clone(), parameter.clone()));
            return Ok(UpdateResult::default());
        }
        let resolver = self.resolver();
        run_update(&self.configuration, &self.connection, statement, parameter, &resolver)
    }

    fn commit(&mut self) -> Result<()> {
        self.flush_batch()?;
        self.connection.borrow_mut().commit()?;
        self.clear_local_cache();
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if let Strategy::Batch { queued } = &mut self.strategy {
            queued.clear();
        }
        self.connection.borrow_mut().rollback()?;
        self.clear_local_cache();
        Ok(())
    }

    fn close(&mut self) {
        let _ = self.flush_batch();
        self.connection.borrow_mut().close();
        self.closed = true;
    }

    fn clear_local_cache(&mut self) {
        self.local_cache.clear();
    }
}

/// Resolves nested selects (§4.9/§4.10) directly against the connection,
/// independent of whatever `&mut self` borrow of the owning executor
/// triggered them. Bypasses the first-level cache: a nested select's own
/// statement id and parameters would need to fold into the parent's cache
/// key to participate safely, which this workspace does not attempt.
pub struct NestedSelectRunner<'a> {
    configuration: &'a Configuration,
    connection: &'a RefCell<Box<dyn Connection>>,
}

impl<'a> NestedSelectRunner<'a> {
    fn project(&self, rows: Vec<RawRow>, result_map_id: &str) -> Result<Vec<Value>> {
        let handler = ResultSetHandler::new(self.configuration);
        let (mut results, deferred) = handler.handle_result_set(rows, result_map_id, self)?;
        self.drain(&mut results, deferred)?;
        Ok(results)
    }

    fn drain(&self, results: &mut Vec<Value>, deferred: Vec<DeferredLoad>) -> Result<()> {
        for load in &deferred {
            let resolved = self.resolve_nested_select(&load.statement_id, load.parameter.clone(), load.single)?;
            apply_deferred(results, load, resolved);
        }
        Ok(())
    }
}

impl<'a> DeferredExecutor for NestedSelectRunner<'a> {
    fn resolve_nested_select(&self, statement_id: &str, parameter: Value, single: bool) -> Result<Value> {
        let statement = self.configuration.require_mapped_statement(statement_id)?;
        let bound = bind_statement(statement, &parameter)?;
        let raw = self.connection.borrow_mut().query(&bound.sql, &positional_values(self.configuration, &bound)?)?;
        let rows = to_raw_rows(self.configuration, raw);

        let Some(result_map_id) = statement.result_map_ids.first() else {
            let scalar = |row: &RawRow| row.columns().names().next().and_then(|c| row.get(c)).cloned();
            return Ok(if single {
                rows.first().and_then(scalar).unwrap_or(Value::Null)
            } else {
                Value::Array(rows.iter().filter_map(scalar).collect())
            });
        };

        let results = self.project(rows, result_map_id)?;
        Ok(if single { results.into_iter().next().unwrap_or(Value::Null) } else { Value::Array(results) })
    }
}

fn run_update(configuration: &Configuration, connection: &RefCell<Box<dyn Connection>>, statement: &MappedStatement, parameter: &mut Value, deferred_executor: &dyn DeferredExecutor) -> Result<UpdateResult> {
    use crate::key_generator::{apply_generated_keys, apply_select_key};
    use sqlcraft_mapping::SelectKeyOrder;

    apply_select_key(&statement.key_generator, SelectKeyOrder::Before, statement.key_property.as_deref(), parameter, &mut |stmt_id, param| {
        run_select_key(configuration, connection, stmt_id, param, deferred_executor)
    })?;

    let bound = bind_statement(statement, &*parameter)?;
    let result = connection.borrow_mut().execute(&bound.sql, &positional_values(configuration, &bound)?)?;
    apply_generated_keys(&statement.key_generator, statement.key_property.as_deref(), parameter, &result.generated_keys)?;

    apply_select_key(&statement.key_generator, SelectKeyOrder::After, statement.key_property.as_deref(), parameter, &mut |stmt_id, param| {
        run_select_key(configuration, connection, stmt_id, param, deferred_executor)
    })?;

    Ok(result)
}

fn run_select_key(configuration: &Configuration, connection: &RefCell<Box<dyn Connection>>, statement_id: &str, parameter: &Value, deferred_executor: &dyn DeferredExecutor) -> Result<Value> {
    let statement = configuration.require_mapped_statement(statement_id)?;
    let bound = bind_statement(statement, parameter)?;
    let raw = connection.borrow_mut().query(&bound.sql, &positional_values(configuration, &bound)?)?;
    let rows = to_raw_rows(configuration, raw);
    if let Some(id) = statement.result_map_ids.first() {
        let handler = ResultSetHandler::new(configuration);
        let (results, _) = handler.handle_result_set(rows, id, deferred_executor)?;
        return Ok(results.into_iter().next().unwrap_or(Value::Null));
    }
    Ok(rows.first().and_then(|r| r.columns().names().next().and_then(|c| r.get(c))).cloned().unwrap_or(Value::Null))
}

fn positional_values(configuration: &Configuration, bound: &sqlcraft_mapping::BoundSql) -> Result<Vec<Value>> {
    bound
        .parameter_mappings
        .iter()
        .map(|mapping| {
            let raw = bound.resolve_property(&mapping.property).cloned().unwrap_or(Value::Null);
            let kind = mapping.value_kind.unwrap_or_else(|| infer_value_kind(&raw));
            let handler = configuration.type_handlers().resolve(kind, mapping.jdbc_type)?;
            handler.set_parameter(&raw)
        })
        .collect()
}

fn infer_value_kind(value: &Value) -> sqlcraft_core::type_handler::ValueKind {
    use sqlcraft_core::type_handler::ValueKind;
    match value {
        Value::Bool(_) => ValueKind::Bool,
        Value::Number(n) if n.is_i64() || n.is_u64() => ValueKind::I64,
        Value::Number(_) => ValueKind::F64,
        Value::String(_) => ValueKind::Str,
        _ => ValueKind::Other,
    }
}

fn to_raw_rows(configuration: &Configuration, result: crate::connection::QueryResult) -> Vec<RawRow> {
    use sqlcraft_result::{ColumnMeta, ColumnSet};
    use std::sync::Arc;

    let columns: Vec<ColumnMeta> = result.columns.into_iter().map(|c| ColumnMeta::aliased(c.name, c.label)).collect();
    let columns = Arc::new(ColumnSet::new(columns, configuration.settings().use_column_label));
    result.rows.into_iter().map(|values| RawRow::new(columns.clone(), values)).collect()
}

fn collect_parent_keys(results: &[Value], primary_map: &sqlcraft_mapping::ResultMap, result_set_name: &str) -> Vec<Value> {
    let Some(mapping) = primary_map.mappings.iter().find(|m| m.result_set.as_deref() == Some(result_set_name)) else {
        return vec![Value::Null; results.len()];
    };
    let Some(column) = &mapping.column else {
        return vec![Value::Null; results.len()];
    };
    results.iter().map(|row| row.get(column).cloned().unwrap_or(Value::Null)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_bounds_default_is_unbounded() {
        let bounds = RowBounds::default();
        let values = vec![Value::from(1), Value::from(2), Value::from(3)];
        assert_eq!(bounds.apply(values.clone()), values);
    }

    #[test]
    fn row_bounds_applies_offset_and_limit() {
        let bounds = RowBounds { offset: 1, limit: 1 };
        let values = vec![Value::from(1), Value::from(2), Value::from(3)];
        assert_eq!(bounds.apply(values), vec![Value::from(2)]);
    }
}
