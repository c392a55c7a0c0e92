//! Cursor (§4.10): a forward-only, single-traversal view over a result set,
//! for callers that want to stream rows rather than materialize the whole
//! list. Rows are consumed from the front as they're read; once consumed
//! (or once `close` is called) they cannot be read again.

use std::collections::VecDeque;

use sqlcraft_core::error::{Error, Result};

use crate::column::RawRow;

/// A lazily-mapped, forward-only row sequence. `map_row` runs once per row,
/// on demand, rather than eagerly over the whole result set.
pub struct Cursor<F>
where
    F: FnMut(RawRow) -> Result<serde_json::Value>,
{
    rows: VecDeque<RawRow>,
    map_row: F,
    closed: bool,
}

impl<F> Cursor<F>
where
    F: FnMut(RawRow) -> Result<serde_json::Value>,
{
    /// Builds a cursor over `rows`, applying `map_row` to each as it's
    /// pulled.
    pub fn new(rows: Vec<RawRow>, map_row: F) -> Self {
        Self {
            rows: rows.into(),
            map_row,
            closed: false,
        }
    }

    /// Pulls and maps the next row, or `None` once exhausted. Returns
    /// `Err` if the cursor was already [`close`](Self::close)d.
    pub fn next_row(&mut self) -> Option<Result<serde_json::Value>> {
        if self.closed {
            return Some(Err(Error::execution(
                "cursor is closed",
                sqlcraft_core::error::Breadcrumb::new().with_activity("reading cursor"),
            )));
        }
        self.rows.pop_front().map(&mut self.map_row)
    }

    /// How many rows remain unread. Only meaningful before `close`.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    /// True once every row has been consumed (not yet `close`d, but nothing
    /// left to read).
    pub fn is_exhausted(&self) -> bool {
        self.rows.is_empty()
    }

    /// True once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Releases the remaining rows and marks the cursor closed. Idempotent.
    pub fn close(&mut self) {
        self.rows.clear();
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnMeta, ColumnSet};
    use serde_json::json;
    use std::sync::Arc;

    fn rows(values: Vec<i64>) -> Vec<RawRow> {
        let columns = Arc::new(ColumnSet::new(vec![ColumnMeta::new("n")], true));
        values.into_iter().map(|v| RawRow::new(columns.clone(), vec![json!(v)])).collect()
    }

    #[test]
    fn reads_rows_once_in_order() {
        let mut cursor = Cursor::new(rows(vec![1, 2, 3]), |row| Ok(row.get("n").cloned().unwrap()));
        assert_eq!(cursor.next_row().unwrap().unwrap(), json!(1));
        assert_eq!(cursor.next_row().unwrap().unwrap(), json!(2));
        assert_eq!(cursor.next_row().unwrap().unwrap(), json!(3));
        assert!(cursor.next_row().is_none());
    }

    #[test]
    fn read_after_close_fails() {
        let mut cursor = Cursor::new(rows(vec![1, 2]), |row| Ok(row.get("n").cloned().unwrap()));
        cursor.close();
        assert!(cursor.next_row().unwrap().is_err());
        assert_eq!(cursor.remaining(), 0);
    }
}
