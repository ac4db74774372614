//! Type descriptors. A closed grammar of shapes; pure data.
//!
//! Nothing here looks at input. Every constructor only enforces its own
//! shape (a tuple's arity, an enumeration's set semantics, `map` over `map`
//! folding into one node).
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::cast::{self, Cast};
use crate::error::SchemaError;
use crate::morphism::{Composition, Morphism};
use crate::value::{Literal, Symbol, Value};

// ----------------------------- PrimitiveKind ------------------------------ //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    String,
    Number,
    BigInt,
    Boolean,
    Symbol,
    Null,
    Undefined,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 7] = [
        PrimitiveKind::String,
        PrimitiveKind::Number,
        PrimitiveKind::BigInt,
        PrimitiveKind::Boolean,
        PrimitiveKind::Symbol,
        PrimitiveKind::Null,
        PrimitiveKind::Undefined,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Number => "number",
            PrimitiveKind::BigInt => "bigint",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Symbol => "symbol",
            PrimitiveKind::Null => "null",
            PrimitiveKind::Undefined => "undefined",
        }
    }

    /// Exact runtime-kind check.
    pub fn admits(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (PrimitiveKind::String, Value::String(_))
                | (PrimitiveKind::Number, Value::Number(_))
                | (PrimitiveKind::BigInt, Value::BigInt(_))
                | (PrimitiveKind::Boolean, Value::Bool(_))
                | (PrimitiveKind::Symbol, Value::Symbol(_))
                | (PrimitiveKind::Null, Value::Null)
                | (PrimitiveKind::Undefined, Value::Undefined)
        )
    }
}

impl FromStr for PrimitiveKind {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrimitiveKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| SchemaError::UnknownPrimitive(s.to_owned()))
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --------------------------------- Type ---------------------------------- //

#[derive(Debug, Clone)]
pub enum Type {
    Unknown,
    Never,
    Primitive(PrimitiveKind),
    Array(Box<Type>),
    Tuple(Vec<Type>),            // arity == len
    Record(Box<Type>),
    Object(IndexMap<String, Type>),
    Enumeration(IndexSet<Literal>),
    Union(Vec<Type>),
    Intersection(Vec<Type>),
    Pure(Value),
    Map {
        composition: Composition,
        inner: Box<Type>,
    },
    Reference(Symbol),
    Recursive {
        symbol: Symbol,
        body: Box<Type>,
    },
}

impl Type {
    pub fn tag(&self) -> &'static str {
        match self {
            Type::Unknown => "unknown",
            Type::Never => "never",
            Type::Primitive(kind) => kind.as_str(),
            Type::Array(_) => "array",
            Type::Tuple(_) => "tuple",
            Type::Record(_) => "record",
            Type::Object(_) => "object",
            Type::Enumeration(_) => "enumeration",
            Type::Union(_) => "union",
            Type::Intersection(_) => "intersection",
            Type::Pure(_) => "pure",
            Type::Map { .. } => "map",
            Type::Reference(_) => "reference",
            Type::Recursive { .. } => "recursive",
        }
    }

    pub fn cast<'v>(&self, input: &'v Value) -> Cast<'v> {
        cast::cast(self)(input)
    }

    /// Number of recursion binders anywhere in the descriptor.
    pub fn binders(&self) -> usize {
        match self {
            Type::Unknown
            | Type::Never
            | Type::Primitive(_)
            | Type::Enumeration(_)
            | Type::Pure(_)
            | Type::Reference(_) => 0,
            Type::Array(item) | Type::Record(item) => item.binders(),
            Type::Map { inner, .. } => inner.binders(),
            Type::Tuple(types) | Type::Union(types) | Type::Intersection(types) => {
                types.iter().map(Type::binders).sum()
            }
            Type::Object(fields) => fields.values().map(Type::binders).sum(),
            Type::Recursive { body, .. } => 1 + body.binders(),
        }
    }
}

// ------------------------------ Constructors ------------------------------ //

pub fn unknown() -> Type { Type::Unknown }
pub fn never() -> Type { Type::Never }
pub fn primitive(kind: PrimitiveKind) -> Type { Type::Primitive(kind) }
pub fn string() -> Type { primitive(PrimitiveKind::String) }
pub fn number() -> Type { primitive(PrimitiveKind::Number) }
pub fn bigint() -> Type { primitive(PrimitiveKind::BigInt) }
pub fn boolean() -> Type { primitive(PrimitiveKind::Boolean) }
pub fn symbol() -> Type { primitive(PrimitiveKind::Symbol) }
pub fn null() -> Type { primitive(PrimitiveKind::Null) }
pub fn undefined() -> Type { primitive(PrimitiveKind::Undefined) }

pub fn array(item: Type) -> Type {
    Type::Array(Box::new(item))
}

pub fn tuple(types: impl IntoIterator<Item = Type>) -> Type {
    Type::Tuple(types.into_iter().collect())
}

pub fn record(item: Type) -> Type {
    Type::Record(Box::new(item))
}

/// Later duplicates of a key replace earlier ones.
pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Type)>) -> Type {
    Type::Object(fields.into_iter().map(|(k, t)| (k.into(), t)).collect())
}

pub fn enumeration<L: Into<Literal>>(values: impl IntoIterator<Item = L>) -> Type {
    Type::Enumeration(values.into_iter().map(Into::into).collect())
}

pub fn union(types: impl IntoIterator<Item = Type>) -> Type {
    Type::Union(types.into_iter().collect())
}

pub fn intersection(types: impl IntoIterator<Item = Type>) -> Type {
    Type::Intersection(types.into_iter().collect())
}

pub fn nullable(ty: Type) -> Type {
    union([ty, null()])
}

pub fn optional(ty: Type) -> Type {
    union([ty, undefined()])
}

pub fn pure(value: impl Into<Value>) -> Type {
    Type::Pure(value.into())
}

pub fn map<F>(morphism: F, inner: Type) -> Type
where
    F: Fn(Value) -> Value + Send + Sync + 'static,
{
    map_with(Arc::new(morphism), inner)
}

/// `map` over an already shared morphism. Mapping a `map` extends its
/// composition rather than nesting a second node.
pub fn map_with(morphism: Morphism, inner: Type) -> Type {
    match inner {
        Type::Map { composition, inner } => Type::Map {
            composition: Composition::compose(morphism, composition),
            inner,
        },
        inner => Type::Map {
            composition: Composition::compose(morphism, Composition::id()),
            inner: Box::new(inner),
        },
    }
}

pub fn reference(symbol: Symbol) -> Type {
    Type::Reference(symbol)
}

pub fn recursive(symbol: Symbol, body: Type) -> Type {
    Type::Recursive { symbol, body: Box::new(body) }
}

// ------------------------------- Display --------------------------------- //

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, types: &[Type], sep: &str) -> fmt::Result {
            for (i, t) in types.iter().enumerate() {
                if i > 0 { f.write_str(sep)?; }
                write!(f, "{t}")?;
            }
            Ok(())
        }

        match self {
            Type::Unknown | Type::Never | Type::Primitive(_) => f.write_str(self.tag()),
            Type::Array(item) => write!(f, "array<{item}>"),
            Type::Tuple(types) => {
                f.write_str("[")?;
                list(f, types, ", ")?;
                f.write_str("]")
            }
            Type::Record(item) => write!(f, "record<{item}>"),
            Type::Object(fields) => {
                f.write_str("{")?;
                for (i, (k, t)) in fields.iter().enumerate() {
                    if i > 0 { f.write_str(",")?; }
                    write!(f, " {k}: {t}")?;
                }
                f.write_str(if fields.is_empty() { "}" } else { " }" })
            }
            Type::Enumeration(values) => {
                f.write_str("enum(")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 { f.write_str(" | ")?; }
                    write!(f, "{v}")?;
                }
                f.write_str(")")
            }
            Type::Union(types) => {
                f.write_str("(")?;
                list(f, types, " | ")?;
                f.write_str(")")
            }
            Type::Intersection(types) => {
                f.write_str("(")?;
                list(f, types, " & ")?;
                f.write_str(")")
            }
            Type::Pure(value) => write!(f, "pure({value})"),
            Type::Map { composition, inner } => write!(f, "map[{}]({inner})", composition.len()),
            Type::Reference(symbol) => f.write_str(symbol.description()),
            Type::Recursive { symbol, body } => write!(f, "μ{}. {body}", symbol.description()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn primitive_kinds_parse_from_their_tags() {
        for kind in PrimitiveKind::ALL {
            assert_eq!(kind.as_str().parse::<PrimitiveKind>(), Ok(kind));
        }
        assert_eq!(
            "integer".parse::<PrimitiveKind>(),
            Err(SchemaError::UnknownPrimitive("integer".into()))
        );
    }

    #[test]
    fn tuple_arity_is_fixed_by_its_arguments() {
        let Type::Tuple(types) = tuple([string(), number(), boolean()]) else { panic!("expected tuple") };
        assert_eq!(types.len(), 3);
    }

    #[test]
    fn enumeration_deduplicates() {
        let Type::Enumeration(values) = enumeration([1, 2, 1, 3, 2]) else { panic!("expected enumeration") };
        assert_eq!(values.len(), 3);
        assert_eq!(values.iter().map(ToString::to_string).collect::<Vec<_>>(), ["1", "2", "3"]);
    }

    #[test]
    fn nullable_and_optional_are_unions() {
        assert_eq!(nullable(string()).to_string(), "(string | null)");
        assert_eq!(optional(number()).to_string(), "(number | undefined)");
    }

    #[test]
    fn map_over_map_flattens() {
        let ty = map(|v| v, map(|v| v, map(|v| v, string())));
        let Type::Map { composition, inner } = &ty else { panic!("expected map") };
        assert_eq!(composition.len(), 3);
        assert!(matches!(**inner, Type::Primitive(PrimitiveKind::String)));
    }

    #[test]
    fn display_shows_structure() {
        let me = Symbol::new("list");
        let ty = recursive(
            me.clone(),
            nullable(object([("head", number()), ("tail", reference(me))])),
        );
        assert_eq!(ty.to_string(), "μlist. ({ head: number, tail: list } | null)");
        assert_eq!(ty.binders(), 1);
        assert_eq!(tuple([array(string()), record(boolean())]).to_string(), "[array<string>, record<boolean>]");
        assert_eq!(enumeration(["a", "b"]).to_string(), r#"enum("a" | "b")"#);
    }

    #[test]
    fn descriptors_are_thread_safe() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Type>();
        assert_send_sync::<Value>();
    }
}
