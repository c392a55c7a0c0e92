//! `<settings>` (§6): `<setting name= value=>` pairs deserialized into
//! [`sqlcraft_core::Settings`] by round-tripping through a JSON object, so
//! every field keeps the defaulting behavior `Settings` already declares.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use sqlcraft_core::error::{Error, Result};
use sqlcraft_core::settings::Settings;

/// Builds a [`Settings`] value from `name -> value` string pairs collected
/// from `<setting>` elements. Unrecognized setting names are rejected
/// (§7 BuildError "unknown setting").
pub fn build_settings(pairs: IndexMap<String, String>) -> Result<Settings> {
    let mut map = Map::new();
    for (name, value) in pairs {
        map.insert(name, coerce(&value));
    }
    let value = Value::Object(map);
    serde_json::from_value(value).map_err(|e| Error::build(format!("unknown setting: {e}")))
}

fn coerce(value: &str) -> Value {
    if value.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if value.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(n) = value.parse::<u64>() {
        return Value::Number(n.into());
    }
    Value::String(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_recognized_settings_over_defaults() {
        let mut pairs = IndexMap::new();
        pairs.insert("cacheEnabled".to_string(), "false".to_string());
        pairs.insert("defaultFetchSize".to_string(), "100".to_string());
        pairs.insert("autoMappingBehavior".to_string(), "FULL".to_string());
        let settings = build_settings(pairs).unwrap();
        assert!(!settings.cache_enabled);
        assert_eq!(settings.default_fetch_size, Some(100));
        assert_eq!(settings.lazy_loading_enabled, false);
    }

    #[test]
    fn rejects_unknown_setting_name() {
        let mut pairs = IndexMap::new();
        pairs.insert("notARealSetting".to_string(), "x".to_string());
        assert!(build_settings(pairs).is_err());
    }
}
