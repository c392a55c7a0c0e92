//! `CacheKey` (§3): composite equality key for both cache levels.

use std::hash::{Hash, Hasher};

use sqlcraft_core::value::Value;

/// Composite equality key identifying one logical query across both cache
/// levels. Equal keys are guaranteed to produce equal hashes (§3) by
/// hashing the same canonical representation used for equality.
#[derive(Debug, Clone)]
pub struct CacheKey {
    statement_id: String,
    offset: i64,
    limit: i64,
    sql: String,
    parameters: Vec<String>,
    environment: Option<String>,
}

impl CacheKey {
    /// Builds a key from its components. `parameters` must already be in
    /// the canonical, type-handler-resolved form (each entry is the
    /// `to_string` of the value as it would be bound), so that equal logical
    /// parameters always produce equal key components regardless of the
    /// `Value` variant used to represent them.
    pub fn new(
        statement_id: impl Into<String>,
        offset: i64,
        limit: i64,
        sql: impl Into<String>,
        parameters: Vec<Value>,
        environment: Option<String>,
    ) -> Self {
        Self {
            statement_id: statement_id.into(),
            offset,
            limit,
            sql: sql.into(),
            parameters: parameters.iter().map(canonical_parameter_repr).collect(),
            environment,
        }
    }
}

fn canonical_parameter_repr(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.statement_id == other.statement_id
            && self.offset == other.offset
            && self.limit == other.limit
            && self.sql == other.sql
            && self.parameters == other.parameters
            && self.environment == other.environment
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.statement_id.hash(state);
        self.offset.hash(state);
        self.limit.hash(state);
        self.sql.hash(state);
        self.parameters.hash(state);
        self.environment.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(params: Vec<Value>) -> CacheKey {
        CacheKey::new("Orders.selectById", 0, -1, "select * from orders where id = ?", params, Some("dev".into()))
    }

    #[test]
    fn equal_components_produce_equal_keys_and_hashes() {
        use std::collections::hash_map::DefaultHasher;

        let a = key(vec![json!(1)]);
        let b = key(vec![json!(1)]);
        assert_eq!(a, b);

        let mut ha = DefaultHasher::new();
        a.hash(&mut ha);
        let mut hb = DefaultHasher::new();
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }

    #[test]
    fn differing_parameters_produce_unequal_keys() {
        assert_ne!(key(vec![json!(1)]), key(vec![json!(2)]));
    }
}
