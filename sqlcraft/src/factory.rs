//! `SqlSessionFactoryBuilder`/`SqlSessionFactory` (§1: "the thin factory/
//! session façade" is named as an external collaborator, not a HARD
//! subsystem — it is deliberately kept thin: no document parsing lives
//! here, that is `sqlcraft-config::ConfigurationBuilder`'s job, and no
//! driver/connection-pool implementation lives here either, that is
//! [`ConnectionFactory`]'s caller's job). What this module owns is wiring
//! a built [`Configuration`] together with a connection source and an
//! interceptor chain into sessions that behave per the active
//! environment's `defaultExecutorType` (§6).

use std::fmt;
use std::sync::Arc;

use sqlcraft_config::Configuration;
use sqlcraft_core::error::Result;
use sqlcraft_core::settings::ExecutorType;
use sqlcraft_exec::{BaseExecutor, CachingExecutor, Connection, SecondLevelCaches};

use crate::interceptor::{InterceptedExecutor, InterceptorChain};
use crate::session::SqlSession;

/// Supplies one connection per opened session. A real deployment
/// implements this against whatever driver it speaks; the connection
/// protocol and any pooling behind it are out of scope here (§1).
pub trait ConnectionFactory: fmt::Debug + Send + Sync {
    /// Opens a new connection for a session.
    fn open_connection(&self) -> Result<Box<dyn Connection>>;
}

/// Builds a [`SqlSessionFactory`] from an already-ingested [`Configuration`]
/// (see `sqlcraft-config::ConfigurationBuilder` for turning configuration/
/// mapper documents into one) plus a connection source.
#[derive(Debug, Default)]
pub struct SqlSessionFactoryBuilder {
    interceptors: InterceptorChain,
}

impl SqlSessionFactoryBuilder {
    /// A builder with no interceptors registered yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an interceptor, applied to every session this factory
    /// opens, in registration order.
    pub fn interceptor(mut self, interceptor: Arc<dyn crate::interceptor::Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Builds the factory. Precomputes the second-level cache registry
    /// once, shared by every session the factory opens afterward.
    pub fn build(self, configuration: Configuration, connection_factory: Arc<dyn ConnectionFactory>) -> SqlSessionFactory {
        let second_level = SecondLevelCaches::build(&configuration);
        SqlSessionFactory {
            configuration,
            second_level,
            connection_factory,
            interceptors: self.interceptors,
        }
    }
}

/// A built factory: holds the shared, read-only [`Configuration`] and
/// second-level cache registry, opening a fresh [`SqlSession`] (one
/// executor, one connection) per call.
#[derive(Debug, Clone)]
pub struct SqlSessionFactory {
    configuration: Configuration,
    second_level: SecondLevelCaches,
    connection_factory: Arc<dyn ConnectionFactory>,
    interceptors: InterceptorChain,
}

impl SqlSessionFactory {
    /// The factory's configuration.
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Opens a new session: a fresh connection, a fresh executor of the
    /// configured variant (`defaultExecutorType`, §6), the interceptor
    /// chain, and the factory's shared second-level caches.
    pub fn open_session(&self) -> Result<SqlSession> {
        let connection = self.connection_factory.open_connection()?;
        let base = match self.configuration.settings().default_executor_type {
            ExecutorType::Simple => BaseExecutor::simple(self.configuration.clone(), connection),
            ExecutorType::Reuse => BaseExecutor::reuse(self.configuration.clone(), connection),
            ExecutorType::Batch => BaseExecutor::batch(self.configuration.clone(), connection),
        };
        let environment = self.configuration.environments().default.clone();
        let caching = CachingExecutor::new(base, self.second_level.clone(), environment);
        let intercepted = InterceptedExecutor::new(caching, self.interceptors.clone());
        let session = sqlcraft_exec::Session::new(self.configuration.clone(), intercepted);
        Ok(SqlSession::new(session, self.configuration.settings().use_actual_param_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sqlcraft_config::ConfigurationBuilder;
    use sqlcraft_core::type_handler::TypeHandlerRegistry;
    use sqlcraft_exec::{DriverColumn, MultiQueryResult, QueryResult, UpdateResult};

    #[derive(Debug, Default)]
    struct StubConnection;

    impl Connection for StubConnection {
        fn query(&mut self, _sql: &str, _params: &[serde_json::Value]) -> Result<QueryResult> {
            Ok(QueryResult {
                columns: vec![DriverColumn { name: "id".into(), label: "id".into() }],
                rows: vec![vec![json!(1)]],
            })
        }
        fn query_multi(&mut self, sql: &str, params: &[serde_json::Value]) -> Result<MultiQueryResult> {
            Ok(MultiQueryResult { result_sets: vec![self.query(sql, params)?] })
        }
        fn execute(&mut self, _sql: &str, _params: &[serde_json::Value]) -> Result<UpdateResult> {
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
    struct StubConnectionFactory;

    impl ConnectionFactory for StubConnectionFactory {
        fn open_connection(&self) -> Result<Box<dyn Connection>> {
            Ok(Box::new(StubConnection))
        }
    }

    fn configuration() -> Configuration {
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
    fn factory_opens_a_session_that_runs_a_statement() {
        let factory = SqlSessionFactoryBuilder::new().build(configuration(), Arc::new(StubConnectionFactory));
        let mut session = factory.open_session().unwrap();
        let rows = session.select_list("Users.findAll", json!({})).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!(1));
    }
}
