//! `Session` (§4.8/§4.9/§4.10 tied together): one open session over one
//! executor. Nested-select resolution happens inside the executor itself
//! (see `NestedSelectRunner` in `executor.rs`), so a session only has to
//! call through to its executor and shape the result.

use serde_json::Value;

use sqlcraft_config::Configuration;
use sqlcraft_core::error::{Error, Result};

use crate::connection::UpdateResult;
use crate::executor::{Executor, RowBounds};

/// One open session: a transaction plus an executor. Not meant to be
/// shared across threads — sessions are scoped to a single caller at a
/// time, matching §5's "one executor instance per session" model.
pub struct Session<E: Executor> {
    configuration: Configuration,
    executor: E,
}

impl<E: Executor> Session<E> {
    /// Opens a session over `executor`.
    pub fn new(configuration: Configuration, executor: E) -> Self {
        Self { configuration, executor }
    }

    /// Runs a mapped SELECT statement, returning every row it produced
    /// through its declared result map. Statements that declare
    /// `resultSets` run through `query_multi` instead, attaching later
    /// sets onto the primary one via `foreignColumn`/`column` (§4.10).
    pub fn select_list(&mut self, statement_id: &str, parameter: Value, bounds: RowBounds) -> Result<Vec<Value>> {
        let statement = self.configuration.require_mapped_statement(statement_id)?.clone();
        if !statement.result_sets.is_empty() {
            return self.executor.query_multi(&statement, parameter);
        }
        let result_map_id = statement
            .result_map_ids
            .first()
            .ok_or_else(|| Error::build(format!("statement `{statement_id}` has no result map")))?
            .clone();
        self.executor.query(&statement, parameter, bounds, &result_map_id)
    }

    /// Runs a mapped SELECT expected to return at most one row.
    pub fn select_one(&mut self, statement_id: &str, parameter: Value) -> Result<Option<Value>> {
        let mut rows = self.select_list(statement_id, parameter, RowBounds::default())?;
        if rows.len() > 1 {
            return Err(Error::execution(
                format!("statement `{statement_id}` returned {} rows, expected at most one", rows.len()),
                sqlcraft_core::error::Breadcrumb::new().with_statement(statement_id),
            ));
        }
        Ok(rows.pop())
    }

    /// Runs a mapped SELECT, indexing the results by `key_property`.
    pub fn select_map(&mut self, statement_id: &str, parameter: Value, key_property: &str) -> Result<indexmap::IndexMap<String, Value>> {
        let rows = self.select_list(statement_id, parameter, RowBounds::default())?;
        let mut map = indexmap::IndexMap::new();
        for row in rows {
            let key = row.get(key_property).cloned().unwrap_or(Value::Null);
            map.insert(canonical_key(&key), row);
        }
        Ok(map)
    }

    /// Runs a mapped INSERT/UPDATE/DELETE. `parameter` is mutated in place
    /// when the statement's key generator writes a generated key back into
    /// it (§4.8).
    pub fn update(&mut self, statement_id: &str, parameter: &mut Value) -> Result<UpdateResult> {
        let statement = self.configuration.require_mapped_statement(statement_id)?.clone();
        self.executor.update(&statement, parameter)
    }

    /// Commits the session's transaction.
    pub fn commit(&mut self) -> Result<()> {
        self.executor.commit()
    }

    /// Rolls back the session's transaction.
    pub fn rollback(&mut self) -> Result<()> {
        self.executor.rollback()
    }

    /// Closes the session.
    pub fn close(&mut self) {
        self.executor.close();
    }
}

fn canonical_key(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caching_executor::{CachingExecutor, SecondLevelCaches};
    use crate::connection::{Connection, DriverColumn, MultiQueryResult, QueryResult};
    use crate::executor::BaseExecutor;
    use serde_json::json;
    use sqlcraft_config::ConfigurationBuilder;
    use sqlcraft_core::type_handler::TypeHandlerRegistry;
    use std::collections::HashMap;

    fn column(name: &str) -> DriverColumn {
        DriverColumn { name: name.to_string(), label: name.to_string() }
    }

    #[derive(Debug, Default)]
    struct ScriptedConnection {
        scripted: HashMap<String, QueryResult>,
        queries_run: Vec<String>,
        executes_run: Vec<String>,
        next_generated_keys: Vec<Value>,
    }

    impl Connection for ScriptedConnection {
        fn query(&mut self, sql: &str, _params: &[Value]) -> Result<QueryResult> {
            self.queries_run.push(sql.to_string());
            Ok(self.scripted.get(sql).cloned().unwrap_or_default())
        }

        fn query_multi(&mut self, sql: &str, params: &[Value]) -> Result<MultiQueryResult> {
            Ok(MultiQueryResult { result_sets: vec![self.query(sql, params)?] })
        }

        fn execute(&mut self, sql: &str, _params: &[Value]) -> Result<UpdateResult> {
            self.executes_run.push(sql.to_string());
            Ok(UpdateResult { rows_affected: 1, generated_keys: std::mem::take(&mut self.next_generated_keys) })
        }

        fn commit(&mut self) -> Result<()> {
            Ok(())
        }

        fn rollback(&mut self) -> Result<()> {
            Ok(())
        }

        fn close(&mut self) {}
    }

    fn orders_and_customers() -> Configuration {
        let mut builder = ConfigurationBuilder::new(None, TypeHandlerRegistry::with_builtins());
        builder
            .add_mapper_document(
                r#"<mapper namespace="Orders">
                    <cache/>
                    <resultMap id="order" type="Order">
                        <id property="id" column="order_id"/>
                        <result property="total" column="total"/>
                        <association property="customer" column="customer_id" select="Customers.findById"/>
                    </resultMap>
                    <select id="findById" resultMap="order">select * from orders where id = #{id}</select>
                    <insert id="insert" useGeneratedKeys="true" keyProperty="id">insert into orders (total) values (#{total})</insert>
                </mapper>"#,
            )
            .unwrap();
        builder
            .add_mapper_document(
                r#"<mapper namespace="Customers">
                    <resultMap id="customer" type="Customer">
                        <id property="id" column="id"/>
                        <result property="name" column="name"/>
                    </resultMap>
                    <select id="findById" resultMap="customer">select * from customers where id = #{_parameter}</select>
                </mapper>"#,
            )
            .unwrap();
        builder.build().unwrap()
    }

    fn scripted_connection() -> ScriptedConnection {
        let mut connection = ScriptedConnection::default();
        connection.scripted.insert(
            "select * from orders where id = ?".to_string(),
            QueryResult {
                columns: vec![column("order_id"), column("total"), column("customer_id")],
                rows: vec![vec![json!(1), json!(250), json!(7)]],
            },
        );
        connection.scripted.insert(
            "select * from customers where id = ?".to_string(),
            QueryResult {
                columns: vec![column("id"), column("name")],
                rows: vec![vec![json!(7), json!("ada")]],
            },
        );
        connection
    }

    #[test]
    fn nested_association_select_resolves_inline() {
        let configuration = orders_and_customers();
        let executor = BaseExecutor::simple(configuration.clone(), Box::new(scripted_connection()));
        let mut session = Session::new(configuration, executor);

        let rows = session.select_list("Orders.findById", json!({"id": 1}), RowBounds::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["total"], json!(250));
        assert_eq!(rows[0]["customer"]["name"], json!("ada"));
    }

    #[test]
    fn select_one_rejects_more_than_one_row() {
        let configuration = orders_and_customers();
        let mut connection = scripted_connection();
        connection.scripted.get_mut("select * from orders where id = ?").unwrap().rows.push(vec![json!(2), json!(10), json!(7)]);
        let executor = BaseExecutor::simple(configuration.clone(), Box::new(connection));
        let mut session = Session::new(configuration, executor);

        assert!(session.select_one("Orders.findById", json!({"id": 1})).is_err());
    }

    #[test]
    fn insert_writes_generated_key_back_into_parameter() {
        let configuration = orders_and_customers();
        let mut connection = scripted_connection();
        connection.next_generated_keys = vec![json!(42)];
        let executor = BaseExecutor::simple(configuration.clone(), Box::new(connection));
        let mut session = Session::new(configuration, executor);

        let mut parameter = json!({"total": 99});
        let result = session.update("Orders.insert", &mut parameter).unwrap();
        assert_eq!(result.rows_affected, 1);
        assert_eq!(parameter["id"], json!(42));
    }

    #[test]
    fn second_level_cache_serves_repeat_query_without_hitting_the_connection_again() {
        let configuration = orders_and_customers();
        let second_level = SecondLevelCaches::build(&configuration);

        let first_executor = CachingExecutor::new(BaseExecutor::simple(configuration.clone(), Box::new(scripted_connection())), second_level.clone(), None);
        let mut first_session = Session::new(configuration.clone(), first_executor);
        let first_rows = first_session.select_list("Orders.findById", json!({"id": 1}), RowBounds::default()).unwrap();
        first_session.commit().unwrap();

        let second_connection = ScriptedConnection::default();
        let second_executor = CachingExecutor::new(BaseExecutor::simple(configuration.clone(), Box::new(second_connection)), second_level, None);
        let mut second_session = Session::new(configuration, second_executor);
        let second_rows = second_session.select_list("Orders.findById", json!({"id": 1}), RowBounds::default()).unwrap();

        assert_eq!(first_rows, second_rows);
    }
}
