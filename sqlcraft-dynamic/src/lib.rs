//! # sqlcraft-dynamic
//!
//! The dynamic SQL node tree, its render context, and the SQL source
//! pipeline that turns a rendered statement body into positional markers
//! plus ordered parameter mappings.

#![deny(missing_docs)]
#![warn(unused_imports)]

mod builder;
mod context;
mod node;

pub use self::{
    builder::{extract_parameter_mappings, shrink_whitespace, DynamicSqlSource, RawSqlSource},
    context::{Bindings, DynamicContext},
    node::SqlNode,
};
