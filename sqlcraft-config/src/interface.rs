//! Interface ingestion's parameter-name resolver (§4.7 "Parameter-name
//! resolver"). Rust has no runtime reflection over method signatures, so
//! where the document path reads XML attributes, this path takes an
//! explicit [`MethodDescriptor`] the caller builds once per bound method
//! (typically generated alongside the interface it describes) and resolves
//! call arguments into the single parameter object a [`SqlSource`] expects.
//!
//! [`SqlSource`]: sqlcraft_mapping::SqlSource

use serde_json::Map;

use sqlcraft_core::value::Value;

/// Why a method parameter is excluded from the bound parameter object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// An ordinary bindable argument.
    Normal,
    /// A `RowBounds`-equivalent: consumed by the caller before binding, never
    /// part of the parameter object.
    RowBounds,
    /// A `ResultHandler`-equivalent: same treatment as `RowBounds`.
    ResultHandler,
}

/// How a normal parameter's value should additionally be exposed when it is
/// the sole bindable argument (§4.7: "Collection arguments are also exposed
/// under `collection` (and `list` when applicable); arrays under `array`").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionHint {
    /// A plain scalar or object; no extra aliasing.
    None,
    /// A `Collection`-equivalent that is not also list-like.
    Collection,
    /// A `List`-equivalent: aliased under both `collection` and `list`.
    List,
    /// An array-equivalent: aliased under `array`.
    Array,
}

/// One method parameter's binding-relevant metadata.
#[derive(Debug, Clone)]
pub struct ParamDescriptor {
    /// `kind` determines whether this parameter participates in binding at
    /// all.
    pub kind: ParamKind,
    /// An explicit `@Param`-equivalent name, if the caller annotated one.
    /// Takes precedence over `declared_name` and the positional index.
    pub explicit_name: Option<String>,
    /// The parameter's own declared name, used when `useActualParamName` is
    /// enabled and no explicit name was given.
    pub declared_name: Option<String>,
    /// Whether (and how) this value should be aliased for unwrapped,
    /// single-parameter collection/array access.
    pub collection_hint: CollectionHint,
}

impl ParamDescriptor {
    /// A normal, unannotated scalar/object parameter.
    pub fn normal(declared_name: impl Into<String>) -> Self {
        Self {
            kind: ParamKind::Normal,
            explicit_name: None,
            declared_name: Some(declared_name.into()),
            collection_hint: CollectionHint::None,
        }
    }

    /// Attaches an explicit `@Param`-equivalent name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.explicit_name = Some(name.into());
        self
    }

    /// Marks this parameter as list-like.
    pub fn as_list(mut self) -> Self {
        self.collection_hint = CollectionHint::List;
        self
    }

    /// Marks this parameter as collection-like but not list-like.
    pub fn as_collection(mut self) -> Self {
        self.collection_hint = CollectionHint::Collection;
        self
    }

    /// Marks this parameter as array-like.
    pub fn as_array(mut self) -> Self {
        self.collection_hint = CollectionHint::Array;
        self
    }
}

/// A bound method's full parameter list, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct MethodDescriptor {
    /// One entry per declared parameter, including reserved ones.
    pub params: Vec<ParamDescriptor>,
}

impl MethodDescriptor {
    /// An empty (no-argument) method.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter descriptor.
    pub fn param(mut self, descriptor: ParamDescriptor) -> Self {
        self.params.push(descriptor);
        self
    }
}

/// Resolves `args` (positionally aligned with `method.params`) into the
/// single parameter object a statement binds against, per §4.7.
///
/// Panics if `args.len() != method.params.len()`; that mismatch means the
/// caller built the descriptor against the wrong method signature, a
/// programming error rather than a recoverable one.
pub fn resolve_parameter_object(method: &MethodDescriptor, args: Vec<Value>, use_actual_param_name: bool) -> Value {
    assert_eq!(args.len(), method.params.len(), "argument count does not match method descriptor");

    let normal_indices: Vec<usize> = method
        .params
        .iter()
        .enumerate()
        .filter(|(_, p)| p.kind == ParamKind::Normal)
        .map(|(i, _)| i)
        .collect();

    if normal_indices.len() == 1 {
        let idx = normal_indices[0];
        let descriptor = &method.params[idx];
        let value = args[idx].clone();
        return match descriptor.collection_hint {
            CollectionHint::None => value,
            CollectionHint::Collection => wrap_single(value, &["collection"]),
            CollectionHint::List => wrap_single(value, &["collection", "list"]),
            CollectionHint::Array => wrap_single(value, &["array"]),
        };
    }

    let mut map = Map::new();
    for (position, &idx) in normal_indices.iter().enumerate() {
        let descriptor = &method.params[idx];
        let name = resolve_name(idx, descriptor, use_actual_param_name);
        let value = args[idx].clone();
        map.insert(name, value.clone());
        let generic_name = format!("param{}", position + 1);
        map.entry(generic_name).or_insert(value);
    }
    Value::Object(map)
}

fn resolve_name(index: usize, descriptor: &ParamDescriptor, use_actual_param_name: bool) -> String {
    if let Some(name) = &descriptor.explicit_name {
        return name.clone();
    }
    if use_actual_param_name {
        if let Some(name) = &descriptor.declared_name {
            return name.clone();
        }
    }
    index.to_string()
}

fn wrap_single(value: Value, aliases: &[&str]) -> Value {
    let mut map = Map::new();
    for alias in aliases {
        map.insert((*alias).to_string(), value.clone());
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_scalar_parameter_passes_through_unwrapped() {
        let method = MethodDescriptor::new().param(ParamDescriptor::normal("id"));
        let resolved = resolve_parameter_object(&method, vec![json!(42)], true);
        assert_eq!(resolved, json!(42));
    }

    #[test]
    fn single_list_parameter_is_aliased() {
        let method = MethodDescriptor::new().param(ParamDescriptor::normal("ids").as_list());
        let resolved = resolve_parameter_object(&method, vec![json!([1, 2, 3])], true);
        assert_eq!(resolved["collection"], json!([1, 2, 3]));
        assert_eq!(resolved["list"], json!([1, 2, 3]));
    }

    #[test]
    fn multi_parameter_uses_declared_names_and_generic_aliases() {
        let method = MethodDescriptor::new()
            .param(ParamDescriptor::normal("id"))
            .param(ParamDescriptor::normal("name"));
        let resolved = resolve_parameter_object(&method, vec![json!(1), json!("ada")], true);
        assert_eq!(resolved["id"], json!(1));
        assert_eq!(resolved["name"], json!("ada"));
        assert_eq!(resolved["param1"], json!(1));
        assert_eq!(resolved["param2"], json!("ada"));
    }

    #[test]
    fn explicit_name_wins_over_declared_name() {
        let method = MethodDescriptor::new()
            .param(ParamDescriptor::normal("id").named("userId"))
            .param(ParamDescriptor::normal("name"));
        let resolved = resolve_parameter_object(&method, vec![json!(7), json!("ada")], true);
        assert_eq!(resolved["userId"], json!(7));
        assert!(resolved.get("id").is_none());
    }

    #[test]
    fn reserved_parameters_are_excluded_from_binding() {
        let method = MethodDescriptor::new()
            .param(ParamDescriptor::normal("id"))
            .param(ParamDescriptor {
                kind: ParamKind::RowBounds,
                explicit_name: None,
                declared_name: Some("bounds".to_string()),
                collection_hint: CollectionHint::None,
            });
        let resolved = resolve_parameter_object(&method, vec![json!(5), json!(null)], true);
        assert_eq!(resolved, json!(5));
    }

    #[test]
    fn positional_index_used_when_actual_param_names_disabled() {
        let method = MethodDescriptor::new()
            .param(ParamDescriptor::normal("a"))
            .param(ParamDescriptor::normal("b"));
        let resolved = resolve_parameter_object(&method, vec![json!(1), json!(2)], false);
        assert_eq!(resolved["0"], json!(1));
        assert_eq!(resolved["1"], json!(2));
    }
}
