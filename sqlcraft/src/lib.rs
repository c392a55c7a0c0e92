#![deny(missing_docs)]
#![warn(unused_imports)]

//! # sqlcraft
//!
//! The façade tying the statement repository, dynamic SQL compiler,
//! executor stack, and result mapping engine into one session API.
//! Deliberately thin (§1): it owns no parsing and no driver/connection-pool
//! implementation, only the wiring between already-built components.
//!
//! Re-exports the subsystem crates under short names, the way a workspace
//! root crate typically fronts its members.

pub use sqlcraft_cache as cache;
pub use sqlcraft_config as config;
pub use sqlcraft_core as core;
pub use sqlcraft_dynamic as dynamic;
pub use sqlcraft_exec as exec;
pub use sqlcraft_mapping as mapping;
pub use sqlcraft_result as result;

mod descriptor;
mod factory;
mod interceptor;
mod session;

pub use descriptor::{MapperMethod, MapperRegistry, MethodResult, ReturnShape};
pub use factory::{ConnectionFactory, SqlSessionFactory, SqlSessionFactoryBuilder};
pub use interceptor::{InterceptedExecutor, Interceptor, InterceptorChain, Invocation};
pub use session::SqlSession;

pub use sqlcraft_config::Configuration;
