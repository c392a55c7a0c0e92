//! Column discovery (§4.10): the column name → index map a result set is
//! read through, honoring `useColumnLabel`.

use std::collections::HashMap;
use std::sync::Arc;

use sqlcraft_core::value::Value;

/// One column's driver-reported identity: its underlying name and its
/// (possibly aliased) label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    /// The underlying column name (e.g. the table column `user_id`).
    pub name: String,
    /// The driver-reported label, which may differ from `name` when the
    /// statement aliases the column (`select user_id as uid`).
    pub label: String,
}

impl ColumnMeta {
    /// A column whose label equals its name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
        }
    }

    /// A column with an explicit alias.
    pub fn aliased(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
        }
    }
}

/// The column layout of one result set, resolved once per query and shared
/// (via [`Arc`]) by every [`RawRow`] drawn from it.
#[derive(Debug)]
pub struct ColumnSet {
    columns: Vec<ColumnMeta>,
    index: HashMap<String, usize>,
}

impl ColumnSet {
    /// Builds a column set from driver-reported metadata. `use_column_label`
    /// mirrors the `useColumnLabel` setting: when true, columns are looked
    /// up by label (falling back to name on a lookup miss); when false,
    /// always by name. Lookups are case-insensitive, matching typical SQL
    /// identifier folding.
    pub fn new(columns: Vec<ColumnMeta>, use_column_label: bool) -> Self {
        let mut index = HashMap::with_capacity(columns.len() * 2);
        for (i, column) in columns.iter().enumerate() {
            let primary = if use_column_label { &column.label } else { &column.name };
            index.entry(primary.to_ascii_lowercase()).or_insert(i);
            index.entry(column.name.to_ascii_lowercase()).or_insert(i);
        }
        Self { columns, index }
    }

    /// The number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True if this result set has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Resolves a column name (or label) to its row index.
    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.index.get(&column.to_ascii_lowercase()).copied()
    }

    /// Every effective column name, in position order, honoring whichever of
    /// name/label this set was built to prefer.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.label.as_str())
    }
}

/// One decoded row, referencing the [`ColumnSet`] it was read through.
#[derive(Debug, Clone)]
pub struct RawRow {
    columns: Arc<ColumnSet>,
    values: Vec<Value>,
}

impl RawRow {
    /// Builds a row from already-decoded column values, in column order.
    pub fn new(columns: Arc<ColumnSet>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Reads a column's raw value by name or label.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.index_of(column).and_then(|i| self.values.get(i))
    }

    /// Reads a column with a prefix stripped first (nested result maps'
    /// `columnPrefix`), falling back to the bare column name when no
    /// prefixed column exists.
    pub fn get_prefixed(&self, column: &str, prefix: Option<&str>) -> Option<&Value> {
        if let Some(prefix) = prefix {
            let prefixed = format!("{prefix}{column}");
            if let Some(value) = self.get(&prefixed) {
                return Some(value);
            }
        }
        self.get(column)
    }

    /// True if every column's value is `Value::Null`, used for the
    /// "non-empty object" rule (§4.10): a row with no non-null data produces
    /// no object at all unless `returnInstanceForEmptyRow` is set.
    pub fn is_entirely_null(&self) -> bool {
        self.values.iter().all(|v| v.is_null())
    }

    /// The columns backing this row.
    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_preferred_over_name_when_use_column_label_is_set() {
        let columns = Arc::new(ColumnSet::new(vec![ColumnMeta::aliased("user_id", "uid")], true));
        let row = RawRow::new(columns, vec![Value::from(7)]);
        assert_eq!(row.get("uid"), Some(&Value::from(7)));
        assert_eq!(row.get("user_id"), Some(&Value::from(7)));
    }

    #[test]
    fn prefixed_lookup_falls_back_to_bare_column() {
        let columns = Arc::new(ColumnSet::new(vec![ColumnMeta::new("name")], true));
        let row = RawRow::new(columns, vec![Value::from("ada")]);
        assert_eq!(row.get_prefixed("name", Some("cust_")), Some(&Value::from("ada")));
    }

    #[test]
    fn entirely_null_row_is_detected() {
        let columns = Arc::new(ColumnSet::new(vec![ColumnMeta::new("a"), ColumnMeta::new("b")], true));
        let all_null = RawRow::new(columns.clone(), vec![Value::Null, Value::Null]);
        let not_null = RawRow::new(columns, vec![Value::Null, Value::from(1)]);
        assert!(all_null.is_entirely_null());
        assert!(!not_null.is_entirely_null());
    }
}
