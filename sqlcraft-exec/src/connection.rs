//! The driver boundary (§1 Non-goals: no concrete driver is implemented
//! here, the same way `other_examples/40077a6a_launchbadge-sqlx__sqlx-core-src-database.rs`
//! models a `Database` trait around a driver it never implements). A real
//! deployment supplies a `Connection` backed by whatever wire protocol it
//! speaks; this crate only depends on the shape below.

use sqlcraft_core::error::Result;
use sqlcraft_core::value::Value;

/// One column's driver-reported name/label, as handed to the result set
/// handler's column discovery.
#[derive(Debug, Clone)]
pub struct DriverColumn {
    /// The underlying column name.
    pub name: String,
    /// The driver-reported label (may differ when the statement aliases
    /// the column).
    pub label: String,
}

/// The raw rows and column metadata produced by one query.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    /// Column metadata, in position order.
    pub columns: Vec<DriverColumn>,
    /// Row data, each inner `Vec` aligned with `columns`.
    pub rows: Vec<Vec<Value>>,
}

/// A query that returned more than one result set (§4.10 "multiple result
/// sets" and §4.9 callable OUT cursors).
#[derive(Debug, Clone, Default)]
pub struct MultiQueryResult {
    /// One [`QueryResult`] per result set, in driver order.
    pub result_sets: Vec<QueryResult>,
}

/// The outcome of an INSERT/UPDATE/DELETE.
#[derive(Debug, Clone, Default)]
pub struct UpdateResult {
    /// Rows affected.
    pub rows_affected: u64,
    /// Driver-generated key columns, in statement-declared order, if the
    /// statement requested them.
    pub generated_keys: Vec<Value>,
}

/// A live connection to the underlying store. Synchronous and
/// dyn-compatible, matching the rest of this workspace's non-async idiom;
/// a real implementation owns whatever pooled/wire-protocol client it
/// needs behind this seam.
pub trait Connection: std::fmt::Debug + Send {
    /// Runs a query expected to produce exactly one result set.
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Runs a query expected to produce more than one result set (§4.10).
    fn query_multi(&mut self, sql: &str, params: &[Value]) -> Result<MultiQueryResult> {
        Ok(MultiQueryResult {
            result_sets: vec![self.query(sql, params)?],
        })
    }

    /// Runs an INSERT/UPDATE/DELETE.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<UpdateResult>;

    /// Commits the current transaction.
    fn commit(&mut self) -> Result<()>;

    /// Rolls back the current transaction.
    fn rollback(&mut self) -> Result<()>;

    /// Releases the connection. Best-effort; errors are not actionable
    /// once a caller has decided to stop using the connection.
    fn close(&mut self);
}
