//! Statement Handlers (§4.9): one per [`StatementType`], responsible for
//! turning a [`MappedStatement`] + parameter object into a [`BoundSql`]
//! ready to hand to a [`crate::connection::Connection`]. Row projection
//! itself is `sqlcraft-result::ResultSetHandler`'s job; this module only
//! validates and renders.
//!
//! Callable statements bind IN parameters exactly like Prepared ones.
//! True OUT/INOUT parameter retrieval and OUT-cursor streaming need a
//! richer driver channel than the minimal, synchronous [`crate::connection::Connection`]
//! this workspace models exposes (see `DESIGN.md`); a Callable statement's
//! extra result sets are still reachable through `query_multi`/`resultSets`
//! the same way a plain multi-result-set SELECT is.

use serde_json::Value;

use sqlcraft_core::error::{Error, Result};
use sqlcraft_mapping::{BoundSql, MappedStatement, StatementType};

/// Renders `statement` against `parameter`, validating statement-type
/// specific constraints.
pub fn bind_statement(statement: &MappedStatement, parameter: &Value) -> Result<BoundSql> {
    let source = statement.sql_source.as_ref().ok_or_else(|| {
        Error::build(format!("statement `{}` has no compiled sql source", statement.id))
    })?;
    let bound = source.bound_sql(parameter)?;

    if statement.statement_type == StatementType::Simple && !bound.parameter_mappings.is_empty() {
        return Err(Error::build(format!(
            "statement `{}` is SIMPLE but its SQL contains `#{{...}}` bindings",
            statement.id
        )));
    }

    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sqlcraft_dynamic::RawSqlSource;
    use sqlcraft_mapping::{CommandType, KeyGenerator, StatementId};
    use std::sync::Arc;

    fn statement(sql: &str, statement_type: StatementType) -> MappedStatement {
        let source = RawSqlSource::compile(sql).unwrap();
        MappedStatement {
            id: StatementId::new("Users", "selectById"),
            command_type: CommandType::Select,
            statement_type,
            sql_source: Some(Arc::new(source)),
            parameter_type: None,
            result_type: None,
            result_map_ids: vec![],
            fetch_size: None,
            timeout: None,
            flush_cache: false,
            use_cache: true,
            key_generator: KeyGenerator::NoKeyGenerator,
            key_property: None,
            key_column: None,
            database_id: None,
            lang: "xml".to_string(),
            result_sets: vec![],
        }
    }

    #[test]
    fn prepared_statement_binds_placeholders() {
        let stmt = statement("select * from users where id = #{id}", StatementType::Prepared);
        let bound = bind_statement(&stmt, &json!({"id": 7})).unwrap();
        assert_eq!(bound.parameter_mappings.len(), 1);
    }

    #[test]
    fn simple_statement_rejects_parameter_bindings() {
        let stmt = statement("select * from users where id = #{id}", StatementType::Simple);
        assert!(bind_statement(&stmt, &json!({"id": 7})).is_err());
    }

    #[test]
    fn simple_statement_with_no_bindings_is_fine() {
        let stmt = statement("select * from users", StatementType::Simple);
        let bound = bind_statement(&stmt, &json!({})).unwrap();
        assert!(bound.parameter_mappings.is_empty());
    }
}
