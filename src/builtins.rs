//! Named morphisms, so schema documents can say `{"map": {"morphism": "merge", ...}}`.
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::error::SchemaError;
use crate::morphism::Morphism;
use crate::value::Value;

static BUILTINS: Lazy<IndexMap<&'static str, Morphism>> = Lazy::new(|| {
    IndexMap::from([
        ("length", Arc::new(length) as Morphism),
        ("keys", Arc::new(keys) as Morphism),
        ("merge", Arc::new(merge) as Morphism),
        ("first", Arc::new(first) as Morphism),
    ])
});

pub fn lookup(name: &str) -> Result<Morphism, SchemaError> {
    BUILTINS
        .get(name)
        .cloned()
        .ok_or_else(|| SchemaError::UnknownMorphism(name.to_owned()))
}

pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTINS.keys().copied()
}

/// Characters of a string, elements of an array, keys of an object.
fn length(v: Value) -> Value {
    match v {
        Value::String(s) => Value::Number(s.chars().count() as f64),
        Value::Array(xs) => Value::Number(xs.len() as f64),
        Value::Object(m) => Value::Number(m.len() as f64),
        _ => Value::Undefined,
    }
}

fn keys(v: Value) -> Value {
    match v {
        Value::Object(m) => Value::Array(m.into_keys().map(Value::String).collect()),
        _ => Value::Undefined,
    }
}

/// Fold an intersection's tuple of objects into one object; later members
/// win on shared keys. Non-object members are skipped.
fn merge(v: Value) -> Value {
    match v {
        Value::Array(xs) => {
            let mut out = IndexMap::new();
            for x in xs {
                if let Value::Object(m) = x {
                    out.extend(m);
                }
            }
            Value::Object(out)
        }
        other => other,
    }
}

fn first(v: Value) -> Value {
    match v {
        Value::Array(xs) => xs.into_iter().next().unwrap_or_default(),
        _ => Value::Undefined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{intersection, map_with, number, object, string};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn merge_joins_intersection_members() {
        let ty = map_with(
            lookup("merge").unwrap(),
            intersection([object([("foo", string())]), object([("bar", number())])]),
        );
        let input = Value::from(json!({"foo": "x", "bar": 1, "baz": true}));
        assert_eq!(ty.cast(&input).to_json(), json!({"status": "success", "values": [{"foo": "x", "bar": 1}]}));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        assert_eq!(length(Value::from("αβγ")), Value::from(3));
        assert_eq!(length(Value::Null), Value::Undefined);
    }

    #[test]
    fn keys_and_first() {
        let v = Value::from(json!({"b": 1, "a": 2}));
        assert_eq!(keys(v).to_json(), json!(["b", "a"]));
        assert_eq!(first(Value::from(json!([7, 8]))), Value::from(7));
        assert_eq!(first(Value::from(json!([]))), Value::Undefined);
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert!(matches!(lookup("reverse"), Err(SchemaError::UnknownMorphism(_))));
        assert_eq!(names().collect::<Vec<_>>(), ["length", "keys", "merge", "first"]);
    }
}
