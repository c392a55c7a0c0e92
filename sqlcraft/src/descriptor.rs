//! Per-interface descriptor table (§4.7 "Parameter-name resolver", §9
//! "mapper proxy" replaced by explicit dispatch). A dynamic language binds
//! an interface method to a statement id through a runtime proxy; Rust has
//! no such mechanism, so callers build one [`MapperMethod`] per method
//! (typically generated alongside the interface it describes) and register
//! it in a [`MapperRegistry`] that [`crate::session::SqlSession::invoke`]
//! looks up by `(interface, method)`.

use std::collections::HashMap;

use serde_json::Value;

use sqlcraft_config::MethodDescriptor;

/// How a mapper method's return value should be shaped out of the rows a
/// statement produced.
#[derive(Debug, Clone)]
pub enum ReturnShape {
    /// Exactly one row is expected; more than one is an error.
    One,
    /// Zero or one row is expected; more than one is an error.
    Optional,
    /// Every row, as a JSON array.
    List,
    /// Every row, indexed by `key_property`.
    Map {
        /// The result property to index by.
        key_property: String,
    },
    /// An INSERT/UPDATE/DELETE; the return value is the affected row count.
    Update,
}

/// One bound mapper method: which statement it runs, how its call
/// arguments resolve into a parameter object, and how its result is
/// shaped.
#[derive(Debug, Clone)]
pub struct MapperMethod {
    /// The fully qualified statement id this method runs.
    pub statement_id: String,
    /// The method's parameter signature, for [`sqlcraft_config::resolve_parameter_object`].
    pub params: MethodDescriptor,
    /// How the result should be shaped.
    pub shape: ReturnShape,
}

impl MapperMethod {
    /// A method that runs `statement_id` with `params` and shapes its
    /// result as `shape`.
    pub fn new(statement_id: impl Into<String>, params: MethodDescriptor, shape: ReturnShape) -> Self {
        Self { statement_id: statement_id.into(), params, shape }
    }
}

/// The dispatch table for one or more bound interfaces, keyed by
/// `(interface name, method name)`.
#[derive(Debug, Default, Clone)]
pub struct MapperRegistry {
    methods: HashMap<(String, String), MapperMethod>,
}

impl MapperRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `method` under `interface`/`method_name`, overwriting any
    /// existing registration for the same pair.
    pub fn register(&mut self, interface: impl Into<String>, method_name: impl Into<String>, method: MapperMethod) {
        self.methods.insert((interface.into(), method_name.into()), method);
    }

    /// Looks up a registered method.
    pub fn get(&self, interface: &str, method_name: &str) -> Option<&MapperMethod> {
        self.methods.get(&(interface.to_string(), method_name.to_string()))
    }
}

/// The shaped outcome of dispatching a [`MapperMethod`] (§9 "mapper
/// proxy"): the caller destructures whichever variant its return type
/// expects.
#[derive(Debug, Clone)]
pub enum MethodResult {
    /// One row, or an error if none/more than one was produced.
    One(Value),
    /// `Some` row, or `None` if the statement produced no rows.
    Optional(Option<Value>),
    /// Every row.
    List(Vec<Value>),
    /// Every row, indexed by a result property.
    Map(indexmap::IndexMap<String, Value>),
    /// The affected row count from an INSERT/UPDATE/DELETE.
    Update(i64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlcraft_config::ParamDescriptor;

    #[test]
    fn registry_round_trips_a_method() {
        let mut registry = MapperRegistry::new();
        registry.register(
            "UserMapper",
            "findById",
            MapperMethod::new("Users.findById", MethodDescriptor::new().param(ParamDescriptor::normal("id")), ReturnShape::One),
        );
        assert!(registry.get("UserMapper", "findById").is_some());
        assert!(registry.get("UserMapper", "missing").is_none());
    }
}
