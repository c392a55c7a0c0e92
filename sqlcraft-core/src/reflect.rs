//! Reflection Metadata Cache (§4.1), reinterpreted for a language without
//! runtime field reflection.
//!
//! The source system memoizes, per target type, its accessor tables and
//! default constructor. Rust exposes none of that at runtime; `serde`
//! already gives field-name-keyed access for any `Deserialize` type (the
//! derive macro generates the equivalent of the accessor table at compile
//! time). What's left to cache here is the part Rust genuinely can't see
//! until you ask at runtime: whether a type has been registered at all, its
//! `std::any::type_name` for diagnostics, and — for `CONSTRUCTOR`-mapped
//! result maps, which don't round-trip through field names — the arity a
//! constructor-style result map must match.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Error, Result};
use crate::value::Value;

/// Implemented by result types that are projected from `CONSTRUCTOR`
/// mappings (§3, Result Mapping: "CONSTRUCTOR mappings must collectively
/// match some constructor of the target type"). Field-based results instead
/// use `serde::de::DeserializeOwned` directly; see `sqlcraft-result`.
pub trait ConstructorResult: Sized + 'static {
    /// The number of constructor arguments this type expects, in
    /// declaration order. Checked against the result map's constructor
    /// mapping count at build time.
    const ARITY: usize;

    /// Builds an instance from the ordered, already-converted constructor
    /// arguments.
    fn from_constructor_args(args: Vec<Value>) -> Result<Self>;
}

/// Cached metadata for one target type.
#[derive(Debug, Clone)]
pub struct TypeMeta {
    /// `std::any::type_name::<T>()`, for diagnostics.
    pub type_name: &'static str,
    /// The constructor arity, if this type was registered as a
    /// [`ConstructorResult`].
    pub constructor_arity: Option<usize>,
}

/// A process-wide cache of [`TypeMeta`], keyed by `TypeId`. Built
/// incrementally as types are first seen; reads after that are lock-free in
/// spirit (a `RwLock` read guard, never a write once warm), matching §4.1's
/// "effectively immutable after first build".
#[derive(Debug, Default)]
pub struct ReflectionCache {
    entries: RwLock<HashMap<TypeId, TypeMeta>>,
}

impl ReflectionCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached metadata for `T`, computing and memoizing it on
    /// first access.
    pub fn meta_for<T: Any>(&self) -> TypeMeta {
        let id = TypeId::of::<T>();
        if let Some(meta) = self.entries.read().unwrap().get(&id) {
            return meta.clone();
        }
        let meta = TypeMeta {
            type_name: std::any::type_name::<T>(),
            constructor_arity: None,
        };
        self.entries.write().unwrap().insert(id, meta.clone());
        meta
    }

    /// Registers `T` as a [`ConstructorResult`], memoizing its arity.
    /// Subsequent calls for the same `T` are no-ops beyond the cache
    /// lookup.
    pub fn register_constructor<T: ConstructorResult>(&self) {
        let id = TypeId::of::<T>();
        let meta = TypeMeta {
            type_name: std::any::type_name::<T>(),
            constructor_arity: Some(T::ARITY),
        };
        self.entries.write().unwrap().insert(id, meta);
    }

    /// Validates that a result map's constructor-mapping count matches the
    /// registered arity for `T`, per the invariant in §3. Call this at
    /// build time, once per result map.
    pub fn check_constructor_arity<T: ConstructorResult>(&self, mapped_args: usize) -> Result<()> {
        self.register_constructor::<T>();
        if mapped_args != T::ARITY {
            return Err(Error::build(format!(
                "constructor result map for `{}` has {} constructor argument(s) but the type expects {}",
                std::any::type_name::<T>(),
                mapped_args,
                T::ARITY,
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair(i64, String);

    impl ConstructorResult for Pair {
        const ARITY: usize = 2;

        fn from_constructor_args(mut args: Vec<Value>) -> Result<Self> {
            if args.len() != 2 {
                return Err(Error::reflection("Pair expects 2 constructor arguments"));
            }
            let b = args.pop().unwrap();
            let a = args.pop().unwrap();
            Ok(Pair(
                a.as_i64().ok_or_else(|| Error::type_conversion("expected integer"))?,
                b.as_str().unwrap_or_default().to_string(),
            ))
        }
    }

    #[test]
    fn memoizes_type_meta() {
        let cache = ReflectionCache::new();
        let first = cache.meta_for::<Pair>();
        let second = cache.meta_for::<Pair>();
        assert_eq!(first.type_name, second.type_name);
    }

    #[test]
    fn constructor_arity_checked() {
        let cache = ReflectionCache::new();
        assert!(cache.check_constructor_arity::<Pair>(2).is_ok());
        assert!(cache.check_constructor_arity::<Pair>(1).is_err());
    }
}
