//! The interceptor chain (§1: "the interception contract IS in scope").
//! MyBatis wraps `Executor`/`ParameterHandler`/`ResultSetHandler`/
//! `StatementHandler` behind dynamic proxies that a configured `Plugin`
//! chain can intercept; Rust has no runtime proxy generation, so this
//! models the same contract as an explicit decorator over [`Executor`]:
//! every interceptor gets a `before` look at the call before it runs and
//! an `after` look at the result once it returns. Discovering and
//! instantiating interceptors from configuration (the "plugin discovery
//! glue" §1 excludes) is not this module's job; callers register already-
//! constructed interceptors with [`InterceptorChain::push`].

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use sqlcraft_core::error::Result;
use sqlcraft_exec::{Executor, RowBounds, UpdateResult};
use sqlcraft_mapping::MappedStatement;

/// What an interceptor observes (and may rewrite) around one executor call.
#[derive(Debug, Clone)]
pub enum Invocation {
    /// A `query` call.
    Query {
        /// The statement id being run.
        statement_id: String,
        /// The parameter object, mutable so a `before` hook can rewrite it.
        parameter: Value,
        /// The row bounds requested.
        bounds: RowBounds,
    },
    /// A `query_multi` call.
    QueryMulti {
        /// The statement id being run.
        statement_id: String,
        /// The parameter object, mutable so a `before` hook can rewrite it.
        parameter: Value,
    },
    /// An `update` call.
    Update {
        /// The statement id being run.
        statement_id: String,
        /// The parameter object, mutable so a `before` hook can rewrite it.
        parameter: Value,
    },
}

impl Invocation {
    /// The statement id this invocation targets.
    pub fn statement_id(&self) -> &str {
        match self {
            Invocation::Query { statement_id, .. } => statement_id,
            Invocation::QueryMulti { statement_id, .. } => statement_id,
            Invocation::Update { statement_id, .. } => statement_id,
        }
    }

    /// The parameter object this invocation currently carries.
    pub fn parameter(&self) -> &Value {
        match self {
            Invocation::Query { parameter, .. } => parameter,
            Invocation::QueryMulti { parameter, .. } => parameter,
            Invocation::Update { parameter, .. } => parameter,
        }
    }
}

/// One interception point. Every hook has a no-op default, so an
/// interceptor only needs to implement the ones it cares about — a
/// pagination plugin only touches `before`/`after_query`, a SQL-logging
/// plugin only reads `before`.
pub trait Interceptor: fmt::Debug + Send + Sync {
    /// Called before the wrapped executor call runs. May rewrite
    /// `invocation`'s parameter object, e.g. to inject a bind variable.
    fn before(&self, invocation: &mut Invocation) -> Result<()> {
        let _ = invocation;
        Ok(())
    }

    /// Called after a successful `query`/`query_multi`, with the rows the
    /// delegate produced. May rewrite them in place.
    fn after_query(&self, invocation: &Invocation, rows: &mut Vec<Value>) -> Result<()> {
        let _ = (invocation, rows);
        Ok(())
    }

    /// Called after a successful `update`, with the outcome the delegate
    /// produced. May rewrite it in place.
    fn after_update(&self, invocation: &Invocation, result: &mut UpdateResult) -> Result<()> {
        let _ = (invocation, result);
        Ok(())
    }
}

/// An ordered list of interceptors, applied outermost-registered-first on
/// the way in and in reverse on the way out — the same nesting order a
/// proxy chain built by wrapping each plugin around the last produces.
#[derive(Debug, Default, Clone)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    /// An empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an interceptor to the chain.
    pub fn push(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    fn run_before(&self, invocation: &mut Invocation) -> Result<()> {
        for interceptor in &self.interceptors {
            interceptor.before(invocation)?;
        }
        Ok(())
    }

    fn run_after_query(&self, invocation: &Invocation, rows: &mut Vec<Value>) -> Result<()> {
        for interceptor in self.interceptors.iter().rev() {
            interceptor.after_query(invocation, rows)?;
        }
        Ok(())
    }

    fn run_after_update(&self, invocation: &Invocation, result: &mut UpdateResult) -> Result<()> {
        for interceptor in self.interceptors.iter().rev() {
            interceptor.after_update(invocation, result)?;
        }
        Ok(())
    }
}

/// Decorates an [`Executor`] with an [`InterceptorChain`]. Installed
/// between [`crate::session::SqlSession`] and its underlying executor
/// stack, so every mapped-statement call passes through the chain
/// regardless of which executor variant (Simple/Reuse/Batch) or caching
/// decorator sits underneath.
#[derive(Debug)]
pub struct InterceptedExecutor<E: Executor> {
    delegate: E,
    chain: InterceptorChain,
}

impl<E: Executor> InterceptedExecutor<E> {
    /// Wraps `delegate` with `chain`.
    pub fn new(delegate: E, chain: InterceptorChain) -> Self {
        Self { delegate, chain }
    }
}

impl<E: Executor> Executor for InterceptedExecutor<E> {
    fn query(&mut self, statement: &MappedStatement, parameter: Value, bounds: RowBounds, result_map_id: &str) -> Result<Vec<Value>> {
        let mut invocation = Invocation::Query { statement_id: statement.id.to_string(), parameter, bounds };
        self.chain.run_before(&mut invocation)?;
        let (parameter, bounds) = match invocation.clone() {
            Invocation::Query { parameter, bounds, .. } => (parameter, bounds),
            _ => unreachable!("invocation kind fixed at construction"),
        };
        let mut rows = self.delegate.query(statement, parameter, bounds, result_map_id)?;
        self.chain.run_after_query(&invocation, &mut rows)?;
        Ok(rows)
    }

    fn query_multi(&mut self, statement: &MappedStatement, parameter: Value) -> Result<Vec<Value>> {
        let mut invocation = Invocation::QueryMulti { statement_id: statement.id.to_string(), parameter };
        self.chain.run_before(&mut invocation)?;
        let parameter = match invocation.clone() {
            Invocation::QueryMulti { parameter, .. } => parameter,
            _ => unreachable!("invocation kind fixed at construction"),
        };
        let mut rows = self.delegate.query_multi(statement, parameter)?;
        self.chain.run_after_query(&invocation, &mut rows)?;
        Ok(rows)
    }

    fn update(&mut self, statement: &MappedStatement, parameter: &mut Value) -> Result<UpdateResult> {
        let mut invocation = Invocation::Update { statement_id: statement.id.to_string(), parameter: parameter.clone() };
        self.chain.run_before(&mut invocation)?;
        if let Invocation::Update { parameter: rewritten, .. } = &invocation {
            *parameter = rewritten.clone();
        }
        let mut result = self.delegate.update(statement, parameter)?;
        self.chain.run_after_update(&invocation, &mut result)?;
        Ok(result)
    }

    fn commit(&mut self) -> Result<()> {
        self.delegate.commit()
    }

    fn rollback(&mut self) -> Result<()> {
        self.delegate.rollback()
    }

    fn close(&mut self) {
        self.delegate.close();
    }

    fn clear_local_cache(&mut self) {
        self.delegate.clear_local_cache();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sqlcraft_config::ConfigurationBuilder;
    use sqlcraft_core::type_handler::TypeHandlerRegistry;
    use sqlcraft_exec::{BaseExecutor, Connection, DriverColumn, MultiQueryResult, QueryResult};

    #[derive(Debug, Default)]
    struct NoopConnection;

    impl Connection for NoopConnection {
        fn query(&mut self, _sql: &str, _params: &[Value]) -> Result<QueryResult> {
            Ok(QueryResult {
                columns: vec![DriverColumn { name: "id".into(), label: "id".into() }],
                rows: vec![vec![json!(1)]],
            })
        }
        fn query_multi(&mut self, sql: &str, params: &[Value]) -> Result<MultiQueryResult> {
            Ok(MultiQueryResult { result_sets: vec![self.query(sql, params)?] })
        }
        fn execute(&mut self, _sql: &str, _params: &[Value]) -> Result<UpdateResult> {
            Ok(UpdateResult::default())
        }
        fn commit(&mut self) -> Result<()> {
            Ok(())
        }
        fn rollback(&mut self) -> Result<()> {
            Ok(())
        }
        fn close(&mut self) {}
    }

    #[derive(Debug)]
    struct RewriteLimitToZero;

    impl Interceptor for RewriteLimitToZero {
        fn before(&self, invocation: &mut Invocation) -> Result<()> {
            if let Invocation::Query { bounds, .. } = invocation {
                bounds.limit = 0;
            }
            Ok(())
        }
    }

    fn configuration() -> sqlcraft_config::Configuration {
        let mut builder = ConfigurationBuilder::new(None, TypeHandlerRegistry::with_builtins());
        builder
            .add_mapper_document(
                r#"<mapper namespace="Users">
                    <resultMap id="user" type="User">
                        <id property="id" column="id"/>
                    </resultMap>
                    <select id="findAll" resultMap="user">select * from users</select>
                </mapper>"#,
            )
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn before_hook_can_rewrite_row_bounds() {
        let configuration = configuration();
        let statement = configuration.require_mapped_statement("Users.findAll").unwrap().clone();
        let executor = BaseExecutor::simple(configuration, Box::new(NoopConnection));
        let mut chain = InterceptorChain::new();
        chain.push(Arc::new(RewriteLimitToZero));
        let mut intercepted = InterceptedExecutor::new(executor, chain);

        let rows = intercepted.query(&statement, json!({}), RowBounds::default(), "Users.user").unwrap();
        assert!(rows.is_empty());
    }
}
