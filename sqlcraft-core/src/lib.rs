//! # sqlcraft-core
//!
//! Shared types used across the sqlcraft workspace: the dynamic value model,
//! the error enum, the reflection metadata cache, the type handler registry,
//! the expression evaluator, and global runtime settings.

#![deny(missing_docs)]
#![deny(unused_imports)]

/// The expression evaluator used by `<if>`/`<when>` conditions and `bind`.
pub mod expr;
/// The error enum and diagnostic breadcrumbs shared across the workspace.
pub mod error;
/// The reflection metadata cache.
pub mod reflect;
/// Global runtime settings (§6).
pub mod settings;
/// The type handler registry (§4.2).
pub mod type_handler;
/// The dynamic value model.
pub mod value;

pub use error::{Breadcrumb, Error, Result};
pub use expr::Expression;
pub use reflect::{ConstructorResult, ReflectionCache, TypeMeta};
pub use settings::Settings;
pub use type_handler::{JdbcType, TypeHandler, TypeHandlerRegistry, ValueKind};
pub use value::{is_truthy, navigate, Value};
