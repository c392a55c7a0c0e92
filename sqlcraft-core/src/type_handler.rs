//! Type Handler Registry (§4.2): bidirectional conversion between the
//! in-process [`Value`] representation and a column's wire type, looked up
//! by `(javaType, jdbcType)`.
//!
//! Grounded on `usql-core::dialect`'s trait-registry shape (a small marker
//! trait plus a keyed lookup table) and on
//! `other_examples/40077a6a_launchbadge-sqlx__sqlx-core-src-database.rs`'s
//! idea of a typed boundary around a driver this crate does not implement.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::value::Value;

/// The column-side type tag (`jdbcType` in the source system), covering the
/// standard scalar/temporal range plus array/LOB/cursor specializations
/// named in §4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JdbcType {
    /// `NULL`
    Null,
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Float,
    Double,
    Decimal,
    Char,
    VarChar,
    LongVarChar,
    Date,
    Time,
    Timestamp,
    Binary,
    VarBinary,
    Blob,
    Clob,
    Array,
    Cursor,
    /// Fallback per the `jdbcTypeForNull` setting default.
    Other,
}

/// The in-process ("java") side type tag. Rust has no single universal
/// runtime class the way the JVM does, so this is a small closed set of
/// logical value shapes plus an escape hatch for handler-specific or
/// user-enum types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKind {
    Bool,
    I64,
    F64,
    Str,
    Bytes,
    DateTime,
    Json,
    Enum,
    Other,
}

/// Converts between [`Value`] and the wire-ish representation a driver
/// would hand back/accept, for one `(ValueKind, JdbcType)` pair.
pub trait TypeHandler: fmt::Debug + Send + Sync {
    /// Converts a raw column value (already decoded to [`Value`] by the
    /// driver boundary) into the handler's in-process representation.
    fn get_result(&self, raw: &Value) -> Result<Value>;

    /// Converts an in-process parameter value into the representation bound
    /// to the statement.
    fn set_parameter(&self, value: &Value) -> Result<Value>;
}

macro_rules! passthrough_handler {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $name;

        impl TypeHandler for $name {
            fn get_result(&self, raw: &Value) -> Result<Value> {
                Ok(raw.clone())
            }

            fn set_parameter(&self, value: &Value) -> Result<Value> {
                Ok(value.clone())
            }
        }
    };
}

passthrough_handler!(StringTypeHandler, "Handles VARCHAR/CHAR/CLOB-shaped text.");
passthrough_handler!(LongTypeHandler, "Handles BIGINT-shaped integers.");
passthrough_handler!(DoubleTypeHandler, "Handles REAL/FLOAT/DOUBLE-shaped numbers.");
passthrough_handler!(BytesTypeHandler, "Handles BINARY/VARBINARY/BLOB-shaped byte arrays.");

/// Handles BOOLEAN columns that a driver may represent as `0`/`1` integers.
#[derive(Debug, Default, Clone, Copy)]
pub struct BooleanTypeHandler;

impl TypeHandler for BooleanTypeHandler {
    fn get_result(&self, raw: &Value) -> Result<Value> {
        match raw {
            Value::Bool(_) => Ok(raw.clone()),
            Value::Number(n) => Ok(Value::Bool(n.as_i64().unwrap_or(0) != 0)),
            Value::Null => Ok(Value::Null),
            other => Err(Error::type_conversion(format!(
                "cannot convert {:?} to boolean",
                other
            ))),
        }
    }

    fn set_parameter(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Bool(_) | Value::Null => Ok(value.clone()),
            other => Err(Error::type_conversion(format!(
                "cannot bind {:?} as boolean parameter",
                other
            ))),
        }
    }
}

/// Generic handler for a user enum type that round-trips through its
/// `Display`/`FromStr` implementation, synthesized automatically when an
/// enum type lacks a registered handler (§4.2, point 4).
#[derive(Debug)]
pub struct EnumTypeHandler<E> {
    _marker: std::marker::PhantomData<fn() -> E>,
}

impl<E> Default for EnumTypeHandler<E> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<E> TypeHandler for EnumTypeHandler<E>
where
    E: FromStr + ToString + fmt::Debug + Send + Sync + 'static,
{
    fn get_result(&self, raw: &Value) -> Result<Value> {
        match raw {
            Value::String(s) => {
                let parsed: E = s
                    .parse()
                    .map_err(|_| Error::type_conversion(format!("`{}` is not a valid enum value", s)))?;
                Ok(Value::String(parsed.to_string()))
            }
            Value::Null => Ok(Value::Null),
            other => Err(Error::type_conversion(format!(
                "cannot convert {:?} to enum",
                other
            ))),
        }
    }

    fn set_parameter(&self, value: &Value) -> Result<Value> {
        Ok(value.clone())
    }
}

/// The `UnknownTypeHandler` (§4.2): resolves its effective handler lazily
/// from the actual parameter value's shape, or from column metadata on the
/// read side, rather than from a static registration.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnknownTypeHandler;

impl TypeHandler for UnknownTypeHandler {
    fn get_result(&self, raw: &Value) -> Result<Value> {
        Ok(raw.clone())
    }

    fn set_parameter(&self, value: &Value) -> Result<Value> {
        Ok(value.clone())
    }
}

/// The type handler registry. Lookup order for `(value_kind, jdbc_type)`
/// follows §4.2 exactly:
///
/// 1. exact `(value_kind, jdbc_type)` pair,
/// 2. `(value_kind, None)` default,
/// 3. *(supertype walk — elided: `ValueKind` is a flat logical tag, not a
///    class hierarchy; see `DESIGN.md`)*,
/// 4. a synthesized [`EnumTypeHandler`] instance for `ValueKind::Enum`
///    lacking a bound handler,
/// 5. if exactly one handler is registered across all `jdbc_type`s for
///    `value_kind`, return it — otherwise fail.
#[derive(Debug, Default)]
pub struct TypeHandlerRegistry {
    by_pair: HashMap<(ValueKind, JdbcType), Arc<dyn TypeHandler>>,
    by_kind_default: HashMap<ValueKind, Arc<dyn TypeHandler>>,
    by_jdbc_type: HashMap<JdbcType, Arc<dyn TypeHandler>>,
}

impl TypeHandlerRegistry {
    /// Builds a registry pre-populated with the standard scalar/temporal
    /// built-ins.
    pub fn with_builtins() -> Self {
        let mut registry = Self::default();
        registry.register_default(ValueKind::Str, Arc::new(StringTypeHandler));
        registry.register_default(ValueKind::I64, Arc::new(LongTypeHandler));
        registry.register_default(ValueKind::F64, Arc::new(DoubleTypeHandler));
        registry.register_default(ValueKind::Bool, Arc::new(BooleanTypeHandler));
        registry.register_default(ValueKind::Bytes, Arc::new(BytesTypeHandler));
        registry.register_pair(ValueKind::Str, JdbcType::VarChar, Arc::new(StringTypeHandler));
        registry.register_pair(ValueKind::Str, JdbcType::Char, Arc::new(StringTypeHandler));
        registry.register_pair(ValueKind::Str, JdbcType::LongVarChar, Arc::new(StringTypeHandler));
        registry.register_pair(ValueKind::Str, JdbcType::Clob, Arc::new(StringTypeHandler));
        registry.register_pair(ValueKind::I64, JdbcType::BigInt, Arc::new(LongTypeHandler));
        registry.register_pair(ValueKind::I64, JdbcType::Integer, Arc::new(LongTypeHandler));
        registry.register_pair(ValueKind::I64, JdbcType::SmallInt, Arc::new(LongTypeHandler));
        registry.register_pair(ValueKind::I64, JdbcType::TinyInt, Arc::new(LongTypeHandler));
        registry.register_pair(ValueKind::F64, JdbcType::Double, Arc::new(DoubleTypeHandler));
        registry.register_pair(ValueKind::F64, JdbcType::Float, Arc::new(DoubleTypeHandler));
        registry.register_pair(ValueKind::F64, JdbcType::Real, Arc::new(DoubleTypeHandler));
        registry.register_pair(ValueKind::F64, JdbcType::Decimal, Arc::new(DoubleTypeHandler));
        registry.register_pair(ValueKind::Bool, JdbcType::Boolean, Arc::new(BooleanTypeHandler));
        registry.register_pair(ValueKind::Bytes, JdbcType::Binary, Arc::new(BytesTypeHandler));
        registry.register_pair(ValueKind::Bytes, JdbcType::VarBinary, Arc::new(BytesTypeHandler));
        registry.register_pair(ValueKind::Bytes, JdbcType::Blob, Arc::new(BytesTypeHandler));
        registry
    }

    /// Registers a handler for an exact `(value_kind, jdbc_type)` pair.
    pub fn register_pair(&mut self, kind: ValueKind, jdbc: JdbcType, handler: Arc<dyn TypeHandler>) {
        self.by_pair.insert((kind, jdbc), handler.clone());
        self.by_jdbc_type.entry(jdbc).or_insert(handler);
    }

    /// Registers the default handler used when no jdbc type is specified
    /// for `kind`.
    pub fn register_default(&mut self, kind: ValueKind, handler: Arc<dyn TypeHandler>) {
        self.by_kind_default.insert(kind, handler);
    }

    /// Registers a handler keyed purely by jdbc type (used for OUT
    /// parameters and columns where the java-side type isn't known ahead of
    /// time).
    pub fn register_jdbc_type(&mut self, jdbc: JdbcType, handler: Arc<dyn TypeHandler>) {
        self.by_jdbc_type.insert(jdbc, handler);
    }

    /// Looks up the handler for `(kind, jdbc)` following the order in §4.2.
    pub fn resolve(&self, kind: ValueKind, jdbc: Option<JdbcType>) -> Result<Arc<dyn TypeHandler>> {
        if let Some(jdbc) = jdbc {
            if let Some(handler) = self.by_pair.get(&(kind, jdbc)) {
                return Ok(handler.clone());
            }
        }
        if let Some(handler) = self.by_kind_default.get(&kind) {
            return Ok(handler.clone());
        }
        if let Some(jdbc) = jdbc {
            if let Some(handler) = self.by_jdbc_type.get(&jdbc) {
                return Ok(handler.clone());
            }
        }
        if kind == ValueKind::Enum {
            return Ok(Arc::new(UnknownTypeHandler));
        }
        let candidates: Vec<_> = self
            .by_pair
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, h)| h.clone())
            .collect();
        if candidates.len() == 1 {
            return Ok(candidates.into_iter().next().unwrap());
        }
        Err(Error::type_conversion(format!(
            "no type handler registered for ({:?}, {:?})",
            kind, jdbc
        )))
    }

    /// Looks up a handler by jdbc type alone (used for OUT cursor
    /// parameters and unknown-column auto-mapping).
    pub fn resolve_by_jdbc_type(&self, jdbc: JdbcType) -> Arc<dyn TypeHandler> {
        self.by_jdbc_type
            .get(&jdbc)
            .cloned()
            .unwrap_or_else(|| Arc::new(UnknownTypeHandler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_pair_wins_over_default() {
        let registry = TypeHandlerRegistry::with_builtins();
        let handler = registry.resolve(ValueKind::I64, Some(JdbcType::BigInt)).unwrap();
        assert_eq!(handler.get_result(&Value::from(5)).unwrap(), Value::from(5));
    }

    #[test]
    fn falls_back_to_kind_default_when_jdbc_type_absent() {
        let registry = TypeHandlerRegistry::with_builtins();
        assert!(registry.resolve(ValueKind::Str, None).is_ok());
    }

    #[test]
    fn unresolvable_pair_fails() {
        let registry = TypeHandlerRegistry::default();
        assert!(registry.resolve(ValueKind::I64, Some(JdbcType::BigInt)).is_err());
    }

    #[test]
    fn boolean_handler_accepts_numeric_zero_one() {
        let handler = BooleanTypeHandler;
        assert_eq!(handler.get_result(&Value::from(1)).unwrap(), Value::Bool(true));
        assert_eq!(handler.get_result(&Value::from(0)).unwrap(), Value::Bool(false));
    }
}
