//! Key generation (§4.8): writing a generated primary key back into the
//! parameter object, either from driver-returned generated keys or from an
//! explicit select-key statement run before or after the primary insert.

use serde_json::{Map, Value};

use sqlcraft_core::error::{Error, Result};
use sqlcraft_mapping::{KeyGenerator, SelectKeyOrder};

/// Runs a `SelectKey` generator if `order` matches, writing its single-row,
/// single-column result into `key_property`. `run_select_key` executes the
/// named statement and returns the scalar key value (the caller, `Session`,
/// is what actually has an executor to run it with).
pub fn apply_select_key(
    key_generator: &KeyGenerator,
    order: SelectKeyOrder,
    key_property: Option<&str>,
    parameter: &mut Value,
    run_select_key: &mut dyn FnMut(&str, &Value) -> Result<Value>,
) -> Result<()> {
    let KeyGenerator::SelectKey {
        statement_id,
        order: declared_order,
    } = key_generator
    else {
        return Ok(());
    };
    if *declared_order != order {
        return Ok(());
    }
    let Some(property) = key_property else {
        return Err(Error::build(format!(
            "select-key generator `{statement_id}` has no `key_property` to write its result into"
        )));
    };
    let generated = run_select_key(statement_id, parameter)?;
    set_property(parameter, property, generated)
}

/// Writes driver-returned generated keys back into `key_property` after a
/// `Jdbc3` insert. `key_column` names which generated-key column, by
/// position, supplies the value when the driver returns more than one.
pub fn apply_generated_keys(key_generator: &KeyGenerator, key_property: Option<&str>, parameter: &mut Value, generated_keys: &[Value]) -> Result<()> {
    if !matches!(key_generator, KeyGenerator::Jdbc3) {
        return Ok(());
    }
    let Some(property) = key_property else {
        return Ok(());
    };
    let Some(value) = generated_keys.first().cloned() else {
        return Ok(());
    };
    set_property(parameter, property, value)
}

/// Writes `value` into `parameter` at a (possibly dotted) property path,
/// creating intermediate objects as needed. The root must already be (or
/// become) a JSON object: key generation only ever targets bean-shaped
/// parameter objects.
fn set_property(parameter: &mut Value, property: &str, value: Value) -> Result<()> {
    if !parameter.is_object() {
        *parameter = Value::Object(Map::new());
    }
    let mut current = parameter;
    let mut segments = property.split('.').peekable();
    while let Some(segment) = segments.next() {
        let object = current
            .as_object_mut()
            .ok_or_else(|| Error::reflection(format!("cannot write key property `{property}`: an intermediate segment is not an object")))?;
        if segments.peek().is_none() {
            object.insert(segment.to_string(), value);
            return Ok(());
        }
        current = object.entry(segment.to_string()).or_insert_with(|| Value::Object(Map::new()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn before_order_runs_only_for_before_generators() {
        let generator = KeyGenerator::SelectKey {
            statement_id: "Users.nextId".to_string(),
            order: SelectKeyOrder::Before,
        };
        let mut parameter = json!({});
        let mut calls = 0;
        apply_select_key(&generator, SelectKeyOrder::After, Some("id"), &mut parameter, &mut |_, _| {
            calls += 1;
            Ok(json!(1))
        })
        .unwrap();
        assert_eq!(calls, 0);
        assert!(parameter.get("id").is_none());
    }

    #[test]
    fn before_generator_writes_key_property() {
        let generator = KeyGenerator::SelectKey {
            statement_id: "Users.nextId".to_string(),
            order: SelectKeyOrder::Before,
        };
        let mut parameter = json!({"name": "ada"});
        apply_select_key(&generator, SelectKeyOrder::Before, Some("id"), &mut parameter, &mut |stmt, _| {
            assert_eq!(stmt, "Users.nextId");
            Ok(json!(42))
        })
        .unwrap();
        assert_eq!(parameter["id"], json!(42));
    }

    #[test]
    fn jdbc3_writes_first_generated_key() {
        let mut parameter = json!({});
        apply_generated_keys(&KeyGenerator::Jdbc3, Some("id"), &mut parameter, &[json!(7), json!(8)]).unwrap();
        assert_eq!(parameter["id"], json!(7));
    }

    #[test]
    fn no_key_generator_is_a_no_op() {
        let mut parameter = json!({});
        apply_generated_keys(&KeyGenerator::NoKeyGenerator, Some("id"), &mut parameter, &[json!(7)]).unwrap();
        assert!(parameter.get("id").is_none());
    }
}
