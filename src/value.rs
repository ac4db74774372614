//! Untyped in-memory values: the input side of a cast.
//!
//! `Value` is deliberately wider than JSON: it also carries `undefined`
//! (what a missing object key reads as), big integers and symbols.
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;

use crate::error::SchemaError;
use crate::stack::ensure_sufficient_stack;

// ------------------------------- Symbol ---------------------------------- //

/// Opaque handle compared by identity, never by description.
///
/// Two `Symbol::new("x")` calls produce two different symbols; clones of one
/// symbol stay equal to it.
#[derive(Clone)]
pub struct Symbol(Arc<str>);

impl Symbol {
    pub fn new(description: impl AsRef<str>) -> Self {
        Self(Arc::from(description.as_ref()))
    }
    pub fn description(&self) -> &str {
        &self.0
    }
    fn address(&self) -> usize {
        Arc::as_ptr(&self.0) as *const u8 as usize
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({}@{:x})", self.0, self.address())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

// -------------------------------- Value ---------------------------------- //

#[derive(Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    BigInt(i128),
    String(String),
    Symbol(Symbol),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>), // insertion order is kept
}

// Nested containers copy one level per frame; grow the stack as they go.
impl Clone for Value {
    fn clone(&self) -> Self {
        match self {
            Value::Undefined => Value::Undefined,
            Value::Null => Value::Null,
            Value::Bool(b) => Value::Bool(*b),
            Value::Number(n) => Value::Number(*n),
            Value::BigInt(n) => Value::BigInt(*n),
            Value::String(s) => Value::String(s.clone()),
            Value::Symbol(s) => Value::Symbol(s.clone()),
            Value::Array(xs) => ensure_sufficient_stack(|| Value::Array(xs.clone())),
            Value::Object(m) => ensure_sufficient_stack(|| Value::Object(m.clone())),
        }
    }
}

impl Value {
    /// Runtime kind, in the same vocabulary as the primitive descriptors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::BigInt(_) => "bigint",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Lossy JSON view for reports: `undefined` becomes `null`, big integers
    /// become numbers when they fit and strings otherwise, symbols become
    /// their display form.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as J;
        match self {
            Value::Undefined | Value::Null => J::Null,
            Value::Bool(b) => J::Bool(*b),
            Value::Number(n) => json_num_pref_i64(*n),
            Value::BigInt(n) => match i64::try_from(*n) {
                Ok(n) => J::from(n),
                Err(_) => J::String(n.to_string()),
            },
            Value::String(s) => J::String(s.clone()),
            Value::Symbol(s) => J::String(s.to_string()),
            Value::Array(xs) => J::Array(xs.iter().map(Value::to_json).collect()),
            Value::Object(m) => J::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

// Helper: prefer emitting integers when exact
fn json_num_pref_i64(n: f64) -> serde_json::Value {
    if n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Value::from(n)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value as J;
        match v {
            J::Null => Value::Null,
            J::Bool(b) => Value::Bool(b),
            // every JSON number is a double once decoded
            J::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            J::String(s) => Value::String(s),
            J::Array(xs) => Value::Array(xs.into_iter().map(Value::from).collect()),
            J::Object(m) => Value::Object(m.into_iter().map(|(k, v)| (k, Value::from(v))).collect()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Bool(b) }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self { Value::Number(n) }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self { Value::Number(n.into()) }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::String(s.to_owned()) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Value::String(s) }
}

impl From<Symbol> for Value {
    fn from(s: Symbol) -> Self { Value::Symbol(s) }
}

impl From<Vec<Value>> for Value {
    fn from(xs: Vec<Value>) -> Self { Value::Array(xs) }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::BigInt(n) => write!(f, "{n}n"),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::Array(xs) => ensure_sufficient_stack(|| {
                f.write_str("[")?;
                for (i, x) in xs.iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    write!(f, "{x}")?;
                }
                f.write_str("]")
            }),
            Value::Object(m) => ensure_sufficient_stack(|| {
                f.write_str("{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    write!(f, "{}: {v}", serde_json::Value::from(k.as_str()))?;
                }
                f.write_str("}")
            }),
            scalar => write!(f, "{}", scalar.to_json()),
        }
    }
}

// ------------------------------- Literal --------------------------------- //

/// The hashable, primitive subset of `Value`; what enumerations hold.
///
/// Numbers compare like a same-value-zero check: `NaN` equals `NaN` and
/// `0.0` equals `-0.0`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Literal {
    Undefined,
    Null,
    Bool(bool),
    Number(OrderedFloat<f64>),
    BigInt(i128),
    String(String),
    Symbol(Symbol),
}

impl Literal {
    /// `None` for arrays and objects.
    pub fn of(value: &Value) -> Option<Literal> {
        Some(match value {
            Value::Undefined => Literal::Undefined,
            Value::Null => Literal::Null,
            Value::Bool(b) => Literal::Bool(*b),
            Value::Number(n) => Literal::Number(OrderedFloat(*n)),
            Value::BigInt(n) => Literal::BigInt(*n),
            Value::String(s) => Literal::String(s.clone()),
            Value::Symbol(s) => Literal::Symbol(s.clone()),
            Value::Array(_) | Value::Object(_) => return None,
        })
    }

    pub fn to_value(&self) -> Value {
        match self {
            Literal::Undefined => Value::Undefined,
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Number(n.0),
            Literal::BigInt(n) => Value::BigInt(*n),
            Literal::String(s) => Value::String(s.clone()),
            Literal::Symbol(s) => Value::Symbol(s.clone()),
        }
    }
}

impl TryFrom<&serde_json::Value> for Literal {
    type Error = SchemaError;

    fn try_from(v: &serde_json::Value) -> Result<Self, Self::Error> {
        Literal::of(&Value::from(v.clone())).ok_or_else(|| SchemaError::InvalidLiteral(v.to_string()))
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self { Literal::String(s.to_owned()) }
}

impl From<f64> for Literal {
    fn from(n: f64) -> Self { Literal::Number(OrderedFloat(n)) }
}

impl From<i32> for Literal {
    fn from(n: i32) -> Self { Literal::Number(OrderedFloat(n.into())) }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self { Literal::Bool(b) }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

// ------------------------------- Tests ------------------------------------ //


#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn symbols_compare_by_identity() {
        let a = Symbol::new("x");
        let b = Symbol::new("x");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(a.description(), b.description());
    }

    #[test]
    fn deep_values_clone_without_overflow() {
        let deep = (0..2_000).fold(Value::Null, |acc, _| Value::Array(vec![acc]));
        assert_eq!(deep.clone(), deep);
    }

    #[test]
    fn json_numbers_decode_to_doubles() {
        let v = Value::from(json!({"a": 1, "b": [true, null, "s"]}));
        let Value::Object(m) = &v else { panic!("expected object") };
        assert_eq!(m["a"], Value::Number(1.0));
        assert_eq!(m["b"], Value::Array(vec![Value::Bool(true), Value::Null, Value::from("s")]));
        // integers come back out as integers
        assert_eq!(v.to_json(), json!({"a": 1, "b": [true, null, "s"]}));
    }

    #[test]
    fn object_key_order_survives_decoding() {
        let v = Value::from(json!({"z": 1, "a": 2, "m": 3}));
        let Value::Object(m) = v else { panic!("expected object") };
        assert_eq!(m.keys().map(String::as_str).collect::<Vec<_>>(), ["z", "a", "m"]);
    }

    #[test]
    fn literals_use_same_value_zero() {
        assert_eq!(Literal::from(f64::NAN), Literal::from(f64::NAN));
        assert_eq!(Literal::from(0.0), Literal::from(-0.0));
        assert_eq!(Literal::of(&Value::Array(vec![])), None);
    }

    #[test]
    fn structured_json_is_not_a_literal() {
        let err = Literal::try_from(&json!([1])).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidLiteral(_)));
        assert_eq!(Literal::try_from(&json!("a")).unwrap(), Literal::from("a"));
    }

    #[test]
    fn display_is_js_like() {
        let v = Value::Array(vec![Value::Undefined, Value::BigInt(7), Value::from(1.5), Value::from("a")]);
        assert_eq!(v.to_string(), r#"[undefined, 7n, 1.5, "a"]"#);
    }
}
