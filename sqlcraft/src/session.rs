//! `SqlSession` (§9 "mapper proxy" replaced by descriptor dispatch): the
//! per-call entry point applications run mapped statements and bound
//! interface methods through. Wraps [`sqlcraft_exec::Session`] with the
//! interceptor chain and the mapper descriptor table.

use serde_json::Value;

use sqlcraft_config::resolve_parameter_object;
use sqlcraft_core::error::{Error, Result};
use sqlcraft_exec::{CachingExecutor, RowBounds};

use crate::descriptor::{MapperMethod, MapperRegistry, MethodResult, ReturnShape};
use crate::interceptor::InterceptedExecutor;

type SessionExecutor = InterceptedExecutor<CachingExecutor<sqlcraft_exec::BaseExecutor>>;

/// One open session over one connection. Not `Send`/`Sync`: a session is
/// scoped to a single caller at a time (§5 "one executor instance per
/// session").
pub struct SqlSession {
    inner: sqlcraft_exec::Session<SessionExecutor>,
    use_actual_param_name: bool,
}

impl SqlSession {
    pub(crate) fn new(inner: sqlcraft_exec::Session<SessionExecutor>, use_actual_param_name: bool) -> Self {
        Self { inner, use_actual_param_name }
    }

    /// Runs a mapped SELECT by id, returning every row.
    pub fn select_list(&mut self, statement_id: &str, parameter: Value) -> Result<Vec<Value>> {
        self.inner.select_list(statement_id, parameter, RowBounds::default())
    }

    /// Runs a mapped SELECT by id with explicit row bounds.
    pub fn select_list_bounded(&mut self, statement_id: &str, parameter: Value, bounds: RowBounds) -> Result<Vec<Value>> {
        self.inner.select_list(statement_id, parameter, bounds)
    }

    /// Runs a mapped SELECT expected to return at most one row.
    pub fn select_one(&mut self, statement_id: &str, parameter: Value) -> Result<Option<Value>> {
        self.inner.select_one(statement_id, parameter)
    }

    /// Runs a mapped SELECT, indexing rows by `key_property`.
    pub fn select_map(&mut self, statement_id: &str, parameter: Value, key_property: &str) -> Result<indexmap::IndexMap<String, Value>> {
        self.inner.select_map(statement_id, parameter, key_property)
    }

    /// Runs a mapped INSERT/UPDATE/DELETE. `parameter` is mutated in place
    /// when a key generator writes a generated key back into it.
    pub fn update(&mut self, statement_id: &str, parameter: &mut Value) -> Result<i64> {
        Ok(self.inner.update(statement_id, parameter)?.rows_affected)
    }

    /// Dispatches a bound interface method looked up from `registry`,
    /// resolving `args` into a parameter object (§4.7) and shaping the
    /// result per the method's [`ReturnShape`].
    pub fn invoke(&mut self, interface: &str, method_name: &str, registry: &MapperRegistry, args: Vec<Value>) -> Result<MethodResult> {
        let method: &MapperMethod = registry
            .get(interface, method_name)
            .ok_or_else(|| Error::binding(format!("no mapper method registered for `{interface}::{method_name}`")))?;
        let mut parameter = resolve_parameter_object(&method.params, args, self.use_actual_param_name);

        match &method.shape {
            ReturnShape::One => {
                let row = self.select_one(&method.statement_id, parameter)?;
                row.map(MethodResult::One)
                    .ok_or_else(|| Error::binding(format!("statement `{}` returned no rows", method.statement_id)))
            }
            ReturnShape::Optional => Ok(MethodResult::Optional(self.select_one(&method.statement_id, parameter)?)),
            ReturnShape::List => Ok(MethodResult::List(self.select_list(&method.statement_id, parameter)?)),
            ReturnShape::Map { key_property } => Ok(MethodResult::Map(self.select_map(&method.statement_id, parameter, key_property)?)),
            ReturnShape::Update => Ok(MethodResult::Update(self.update(&method.statement_id, &mut parameter)?)),
        }
    }

    /// Commits the session's transaction, flushing the second-level cache's
    /// staged writes.
    pub fn commit(&mut self) -> Result<()> {
        self.inner.commit()
    }

    /// Rolls back the session's transaction.
    pub fn rollback(&mut self) -> Result<()> {
        self.inner.rollback()
    }

    /// Closes the session.
    pub fn close(&mut self) {
        self.inner.close();
    }
}
