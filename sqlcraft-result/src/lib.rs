//! Result Set Handler (§4.10): column discovery, auto-mapping, nested
//! result map collapsing, discriminator dispatch, nested-select loading,
//! multiple result sets, and cursors.

#![deny(missing_docs)]
#![warn(unused_imports)]

mod column;
mod cursor;
mod handler;

pub use column::{ColumnMeta, ColumnSet, RawRow};
pub use cursor::Cursor;
pub use handler::{apply_deferred, DeferredExecutor, DeferredLoad, PathStep, ResultSetHandler};
