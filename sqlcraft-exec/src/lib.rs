#![deny(missing_docs)]
#![warn(unused_imports)]

//! Executor Stack, Statement Handlers, and session runtime (§4.8/§4.9):
//! turns a bound statement into driver calls, owns the first- and
//! second-level caches, and exposes the `Session` API applications run
//! mapped statements through.

mod caching_executor;
mod connection;
mod executor;
mod key_generator;
mod session;
mod statement_handler;

pub use caching_executor::{build_second_level_cache, CachingExecutor, SecondLevelCaches};
pub use connection::{Connection, DriverColumn, MultiQueryResult, QueryResult, UpdateResult};
pub use executor::{BaseExecutor, Executor, RowBounds};
pub use key_generator::{apply_generated_keys, apply_select_key};
pub use session::Session;
pub use statement_handler::bind_statement;
