//! The dynamic value model shared by parameter objects, bindings, and
//! projected rows.
//!
//! Rust has no runtime reflection over arbitrary struct fields, so rather
//! than reimplementing Java's `getProperty`/`setProperty` machinery this
//! crate represents the "current parameter object" and "current row" as
//! [`serde_json::Value`] and leans on `serde` to move in and out of it. See
//! Design Notes §9 and `DESIGN.md`.

/// The parameter / bindings / row value type.
pub type Value = serde_json::Value;

/// Navigates a dot/bracket property path (`a.b[0].c`) against a [`Value`],
/// returning `None` on any missing segment rather than erroring — a null-safe
/// read, per §4.3.
pub fn navigate<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in split_path(path) {
        current = match segment {
            PathSegment::Field(name) => current.as_object()?.get(name)?,
            PathSegment::Index(idx) => current.as_array()?.get(idx)?,
            PathSegment::Key(key) => current.as_object()?.get(key)?,
        };
    }
    Some(current)
}

/// A single segment of a parsed property path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment<'a> {
    Field(&'a str),
    Index(usize),
    Key(&'a str),
}

/// Splits `a.b[0]["c"]` into path segments. Does not allocate beyond the
/// returned `Vec`; each segment borrows from `path`.
fn split_path(path: &str) -> Vec<PathSegment<'_>> {
    let mut segments = Vec::new();
    let mut rest = path;
    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix('.') {
            rest = stripped;
            continue;
        }
        if let Some(stripped) = rest.strip_prefix('[') {
            let end = stripped.find(']').unwrap_or(stripped.len());
            let inner = &stripped[..end];
            let trimmed = inner.trim_matches(|c| c == '\'' || c == '"');
            if let Ok(idx) = trimmed.parse::<usize>() {
                segments.push(PathSegment::Index(idx));
            } else {
                segments.push(PathSegment::Key(trimmed));
            }
            rest = stripped.get(end + 1..).unwrap_or("");
            continue;
        }
        let end = rest
            .find(|c| c == '.' || c == '[')
            .unwrap_or(rest.len());
        segments.push(PathSegment::Field(&rest[..end]));
        rest = &rest[end..];
    }
    segments
}

/// The truthiness rule documented in §4.3: `null` is false, a `Bool` is
/// itself, a nonzero number is true, a nonempty string is true *except* that
/// the literal strings `"0"` and `"false"` are treated as false (the
/// documented MyBatis-OGNL convention for boolean coercion of strings).
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty() && s != "0" && s != "false",
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Numeric promotion: reads a [`Value`] as `f64` for arithmetic/comparison,
/// returning `None` for values with no sensible numeric reading.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn navigate_dotted_and_indexed_path() {
        let root = json!({"a": {"b": [10, 20, {"c": 5}]}});
        assert_eq!(navigate(&root, "a.b[0]"), Some(&json!(10)));
        assert_eq!(navigate(&root, "a.b[2].c"), Some(&json!(5)));
        assert_eq!(navigate(&root, "a.b[9]"), None);
        assert_eq!(navigate(&root, "missing.path"), None);
    }

    #[test]
    fn truthiness_rules() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(false)));
        assert!(is_truthy(&json!(true)));
        assert!(!is_truthy(&json!(0)));
        assert!(is_truthy(&json!(1)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!("0")));
        assert!(!is_truthy(&json!("false")));
        assert!(is_truthy(&json!("anything else")));
    }
}
