//! `DynamicContext` (§4.5): the state threaded through a dynamic SQL node
//! tree's `apply` pass.

use indexmap::IndexMap;

use sqlcraft_core::value::Value;

/// A case-insensitive binding name, stored lowercased; the original
/// spelling is preserved in the map's value position via [`Bindings::iter`]
/// if ever needed, but lookups and inserts are purely by lowercase key.
fn canonical(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// The case-insensitive bindings map threaded through a dynamic SQL render,
/// seeded with `_parameter` and `_databaseId` (§4.5).
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    entries: IndexMap<String, Value>,
}

impl Bindings {
    /// Creates an empty bindings map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites a binding, case-insensitively.
    pub fn set(&mut self, name: impl AsRef<str>, value: Value) {
        self.entries.insert(canonical(name.as_ref()), value);
    }

    /// Looks up a binding, case-insensitively.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(&canonical(name))
    }

    /// Removes a binding, case-insensitively. Used by `foreach` to clean up
    /// per-iteration item/index bindings once the loop completes.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.entries.shift_remove(&canonical(name))
    }

    /// Consumes the map, returning its entries in insertion order. Used by
    /// the SQL source pipeline to populate `BoundSql::additional_parameters`.
    pub fn into_entries(self) -> IndexMap<String, Value> {
        self.entries
    }
}

/// The render-time state for one statement invocation's dynamic SQL.
///
/// Plays the role a parser's cursor+state plays during a parse: instead of
/// consuming input, each [`crate::node::SqlNode::apply`] call appends to
/// `sql` and may add bindings.
#[derive(Debug, Clone)]
pub struct DynamicContext {
    /// The root parameter object passed to the invocation.
    pub parameter_object: Value,
    /// Case-insensitive bindings, seeded with `_parameter`/`_databaseId` and
    /// grown by `bind` and `foreach`.
    pub bindings: Bindings,
    /// The SQL text accumulated so far.
    sql: String,
}

impl DynamicContext {
    /// Creates a context for `parameter_object`, seeding `_parameter` and
    /// (when present) `_databaseId`.
    pub fn new(parameter_object: Value, database_id: Option<&str>) -> Self {
        let mut bindings = Bindings::new();
        bindings.set("_parameter", parameter_object.clone());
        if let Some(id) = database_id {
            bindings.set("_databaseId", Value::String(id.to_string()));
        }
        Self {
            parameter_object,
            bindings,
            sql: String::new(),
        }
    }

    /// Appends a raw SQL fragment to the accumulator verbatim. Mapper
    /// authors are expected to include the whitespace their SQL needs
    /// (exactly as XML text-node content does); runs of whitespace left
    /// over from conditional branches are collapsed later by
    /// `shrinkWhitespacesInSql`, not hidden here.
    pub fn append_sql(&mut self, fragment: &str) {
        self.sql.push_str(fragment);
    }

    /// Returns the SQL accumulated so far.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Consumes the context, returning the accumulated SQL.
    pub fn into_sql(self) -> String {
        self.sql
    }

    /// Builds the evaluation root used for `test` expressions and `${...}`
    /// substitution: the parameter object's own fields (if it's an object),
    /// overlaid with the current bindings (bindings win on conflict).
    pub fn eval_root(&self) -> Value {
        let mut map = self
            .parameter_object
            .as_object()
            .cloned()
            .unwrap_or_default();
        for (key, value) in self.bindings.entries.iter() {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }

    /// Creates a sub-context sharing this context's parameter object and a
    /// snapshot of its bindings, with its own empty SQL accumulator.
    /// `trim` and `foreach` render children into a child context so they
    /// can post-process the child's SQL (strip overrides, rename
    /// placeholders) before appending it to the parent.
    pub fn child(&self) -> Self {
        Self {
            parameter_object: self.parameter_object.clone(),
            bindings: self.bindings.clone(),
            sql: String::new(),
        }
    }

    /// Merges a child context's bindings back into this one, after
    /// rendering its children (which may have introduced new `bind` or
    /// `foreach` bindings that later siblings need to see).
    pub fn absorb_bindings(&mut self, child: Self) {
        for (key, value) in child.bindings.entries {
            self.bindings.entries.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn seeds_parameter_and_database_id() {
        let ctx = DynamicContext::new(json!({"a": 1}), Some("mysql"));
        assert_eq!(ctx.bindings.get("_parameter"), Some(&json!({"a": 1})));
        assert_eq!(ctx.bindings.get("_databaseId"), Some(&json!("mysql")));
    }

    #[test]
    fn bindings_are_case_insensitive() {
        let mut ctx = DynamicContext::new(json!({}), None);
        ctx.bindings.set("Item", json!(5));
        assert_eq!(ctx.bindings.get("item"), Some(&json!(5)));
        assert_eq!(ctx.bindings.get("ITEM"), Some(&json!(5)));
    }

    #[test]
    fn append_sql_concatenates_verbatim() {
        let mut ctx = DynamicContext::new(json!({}), None);
        ctx.append_sql("SELECT * ");
        ctx.append_sql("FROM t");
        assert_eq!(ctx.sql(), "SELECT * FROM t");
    }

    #[test]
    fn eval_root_overlays_bindings_on_parameter_object() {
        let mut ctx = DynamicContext::new(json!({"a": 1, "b": 2}), None);
        ctx.bindings.set("b", json!(99));
        let root = ctx.eval_root();
        assert_eq!(root["a"], json!(1));
        assert_eq!(root["b"], json!(99));
    }
}
