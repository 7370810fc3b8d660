//! Storage for the results of cached read operations.
//!
//! Entries are addressed by a scope (`owner.statement`) and a key (the JSON
//! text of the call's argument values). A stored value is never handed out
//! directly: readers clone it into the operation's return type.

mod bounded;
mod memory;

pub use bounded::LruQueryCache;
pub use memory::MemoryCache;

use crate::core::{BindError, Result, Value};
use serde::{Serialize, Serializer};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Immutable snapshot of an operation result.
pub type CachedValue = Arc<dyn Any + Send + Sync>;

/// A cache backend. Implementations must be safe to call from concurrent
/// operations.
pub trait QueryCache: Send + Sync {
    fn get(&self, scope: &str, key: &str) -> Option<CachedValue>;

    fn put(&self, scope: &str, key: &str, value: CachedValue);
}

/// Scope of a statement's entries.
pub fn cache_scope(owner_key: &str, statement: &str) -> String {
    format!("{owner_key}.{statement}")
}

/// Cache key of one call: its argument values as a JSON array, every value
/// tagged with its type so `1`, `"1"`, `NULL` and `NaN` never share a key.
pub fn cache_key(args: &[Value]) -> Result<String> {
    let tagged: Vec<Tagged<'_>> = args.iter().map(Tagged).collect();
    serde_json::to_string(&tagged).map_err(|e| BindError::Decode(format!("cache key: {e}")))
}

struct Tagged<'a>(&'a Value);

impl Serialize for Tagged<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0 {
            Value::Null => serializer.serialize_unit_variant("Value", 0, "Null"),
            Value::Integer(i) => serializer.serialize_newtype_variant("Value", 1, "Integer", i),
            // JSON has no NaN or infinity, so those are spelled out.
            Value::Float(f) if f.is_finite() => {
                serializer.serialize_newtype_variant("Value", 2, "Float", f)
            }
            Value::Float(f) => {
                serializer.serialize_newtype_variant("Value", 2, "Float", &f.to_string())
            }
            Value::Text(s) => serializer.serialize_newtype_variant("Value", 3, "Text", s),
            Value::Boolean(b) => serializer.serialize_newtype_variant("Value", 4, "Boolean", b),
            Value::List(items) => {
                let items: Vec<Tagged<'_>> = items.iter().map(Tagged).collect();
                serializer.serialize_newtype_variant("Value", 5, "List", &items)
            }
            Value::Record(fields) => {
                let fields: BTreeMap<&str, Tagged<'_>> = fields
                    .iter()
                    .map(|(name, value)| (name.as_str(), Tagged(value)))
                    .collect();
                serializer.serialize_newtype_variant("Value", 6, "Record", &fields)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_distinguishes_types() {
        let text = cache_key(&[Value::from("1")]).unwrap();
        let int = cache_key(&[Value::Integer(1)]).unwrap();
        assert_ne!(text, int);
        assert_eq!(cache_key(&[]).unwrap(), "[]");
        assert_eq!(text, r#"[{"Text":"1"}]"#);
        assert_eq!(int, r#"[{"Integer":1}]"#);
        assert_eq!(cache_scope("app.User", "FindAll"), "app.User.FindAll");
    }

    #[test]
    fn test_key_keeps_non_finite_floats_apart() {
        let keys: Vec<String> = [
            Value::Null,
            Value::Float(f64::NAN),
            Value::Float(f64::INFINITY),
            Value::Float(f64::NEG_INFINITY),
            Value::Text("NaN".to_string()),
        ]
        .into_iter()
        .map(|value| cache_key(&[value]).unwrap())
        .collect();
        for (i, key) in keys.iter().enumerate() {
            for other in &keys[i + 1..] {
                assert_ne!(key, other);
            }
        }
        assert_eq!(keys[1], r#"[{"Float":"NaN"}]"#);
        assert_eq!(cache_key(&[Value::Float(1.5)]).unwrap(), r#"[{"Float":1.5}]"#);
    }
}
