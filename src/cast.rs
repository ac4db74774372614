//! The cast interpreter.
//!
//! Checks an untyped value against a descriptor and rebuilds *every* reading
//! the descriptor allows. Ambiguity is kept, never resolved: a union whose
//! members overlap yields one candidate per matching member, and composites
//! take the Cartesian product of their parts' candidates.
//!
//! Input failures are data (`Cast::Failure`, `Cast::Unbound`), shaped like
//! the descriptor that was attempted so a caller can tell exactly which
//! index, key or member went wrong.
use indexmap::{IndexMap, IndexSet};
use serde_json::json;

use crate::stack::ensure_sufficient_stack;
use crate::types::{PrimitiveKind, Type};
use crate::value::{Literal, Symbol, Value};

// ------------------------------- Results --------------------------------- //

#[derive(Debug, Clone, PartialEq)]
pub enum Cast<'v> {
    /// Non-empty, in discovery order, duplicates kept.
    Success { values: Vec<Value> },
    Failure(Failure<'v>),
    /// A `reference` with no binding in scope: a malformed descriptor, not
    /// bad input.
    Unbound { symbol: Symbol },
}

/// Every variant borrows the input it was given; nothing is copied until a
/// report asks for it.
#[derive(Debug, Clone, PartialEq)]
pub enum Failure<'v> {
    Never { actual: &'v Value },
    Primitive { expected: PrimitiveKind, actual: &'v Value },
    /// `items` is `None` when the input was not a sequence at all.
    Array { items: Option<Vec<Cast<'v>>>, actual: &'v Value },
    /// `items` is `None` on an arity mismatch.
    Tuple { length: usize, items: Option<Vec<Cast<'v>>>, actual: &'v Value },
    Record { properties: Option<IndexMap<String, Cast<'v>>>, actual: &'v Value },
    Object { properties: Option<IndexMap<String, Cast<'v>>>, actual: &'v Value },
    Enumeration { values: IndexSet<Literal>, actual: &'v Value },
    Union { variants: Vec<Cast<'v>>, actual: &'v Value },
    Intersection { results: Vec<Cast<'v>>, actual: &'v Value },
}

impl<'v> Cast<'v> {
    fn success(value: Value) -> Self {
        Cast::Success { values: vec![value] }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Cast::Success { .. })
    }

    pub fn values(&self) -> Option<&[Value]> {
        match self {
            Cast::Success { values } => Some(values),
            _ => None,
        }
    }

    pub fn into_values(self) -> Option<Vec<Value>> {
        match self {
            Cast::Success { values } => Some(values),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure<'v>> {
        match self {
            Cast::Failure(failure) => Some(failure),
            _ => None,
        }
    }

    /// Report form: `{"status": "success" | "failure" | "unbound", ...}`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Cast::Success { values } => json!({
                "status": "success",
                "values": values.iter().map(Value::to_json).collect::<Vec<_>>(),
            }),
            Cast::Failure(failure) => failure.to_json(),
            Cast::Unbound { symbol } => json!({
                "status": "unbound",
                "symbol": symbol.description(),
            }),
        }
    }
}

impl<'v> Failure<'v> {
    pub fn expected(&self) -> &'static str {
        match self {
            Failure::Never { .. } => "never",
            Failure::Primitive { expected, .. } => expected.as_str(),
            Failure::Array { .. } => "array",
            Failure::Tuple { .. } => "tuple",
            Failure::Record { .. } => "record",
            Failure::Object { .. } => "object",
            Failure::Enumeration { .. } => "enumeration",
            Failure::Union { .. } => "union",
            Failure::Intersection { .. } => "intersection",
        }
    }

    pub fn actual(&self) -> &'v Value {
        match self {
            Failure::Never { actual }
            | Failure::Primitive { actual, .. }
            | Failure::Array { actual, .. }
            | Failure::Tuple { actual, .. }
            | Failure::Record { actual, .. }
            | Failure::Object { actual, .. }
            | Failure::Enumeration { actual, .. }
            | Failure::Union { actual, .. }
            | Failure::Intersection { actual, .. } => *actual,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        fn casts(xs: &[Cast<'_>]) -> serde_json::Value {
            serde_json::Value::Array(xs.iter().map(Cast::to_json).collect())
        }
        fn keyed(m: &IndexMap<String, Cast<'_>>) -> serde_json::Value {
            serde_json::Value::Object(m.iter().map(|(k, c)| (k.clone(), c.to_json())).collect())
        }

        let mut o = json!({ "status": "failure", "expected": self.expected() });
        match self {
            Failure::Never { .. } | Failure::Primitive { .. } => {}
            Failure::Array { items, .. } => {
                if let Some(items) = items { o["items"] = casts(items); }
            }
            Failure::Tuple { length, items, .. } => {
                o["length"] = json!(length);
                if let Some(items) = items { o["items"] = casts(items); }
            }
            Failure::Record { properties, .. } | Failure::Object { properties, .. } => {
                if let Some(properties) = properties { o["properties"] = keyed(properties); }
            }
            Failure::Enumeration { values, .. } => {
                o["values"] = values.iter().map(|l| l.to_value().to_json()).collect();
            }
            Failure::Union { variants, .. } => o["variants"] = casts(variants),
            Failure::Intersection { results, .. } => o["results"] = casts(results),
        }
        o["actual"] = self.actual().to_json();
        o
    }
}

// -------------------------------- Scope ---------------------------------- //

/// Bindings introduced by enclosing `recursive` nodes, innermost first.
struct Scope<'a> {
    symbol: &'a Symbol,
    body: &'a Type,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    fn lookup(mut scope: Option<&'a Scope<'a>>, symbol: &Symbol) -> Option<&'a Type> {
        while let Some(frame) = scope {
            if frame.symbol == symbol {
                return Some(frame.body);
            }
            scope = frame.parent;
        }
        None
    }
}

// ------------------------------- Front API -------------------------------- //

/// `cast(ty)(input)`. The returned closure borrows `ty` and keeps no state
/// between calls; its result borrows `input`.
pub fn cast(ty: &Type) -> impl for<'v> Fn(&'v Value) -> Cast<'v> + '_ {
    move |input| cast_type(None, ty, input)
}

static UNDEFINED: Value = Value::Undefined;

fn cast_type<'a, 'v>(scope: Option<&'a Scope<'a>>, ty: &'a Type, actual: &'v Value) -> Cast<'v> {
    ensure_sufficient_stack(|| match ty {
        Type::Unknown => Cast::success(actual.clone()),
        Type::Never => Cast::Failure(Failure::Never { actual }),
        Type::Primitive(kind) => {
            if kind.admits(actual) {
                Cast::success(actual.clone())
            } else {
                Cast::Failure(Failure::Primitive { expected: *kind, actual })
            }
        }
        Type::Array(item) => {
            let Value::Array(elements) = actual else {
                return Cast::Failure(Failure::Array { items: None, actual });
            };
            let items = elements.iter().map(|e| cast_type(scope, item, e)).collect();
            match split(items) {
                Ok(columns) => Cast::Success {
                    values: nondet(columns).into_iter().map(Value::Array).collect(),
                },
                Err(items) => Cast::Failure(Failure::Array { items: Some(items), actual }),
            }
        }
        Type::Tuple(types) => {
            let length = types.len();
            let elements = match actual {
                Value::Array(elements) if elements.len() == length => elements,
                _ => return Cast::Failure(Failure::Tuple { length, items: None, actual }),
            };
            let items = types.iter().zip(elements).map(|(t, e)| cast_type(scope, t, e)).collect();
            match split(items) {
                Ok(columns) => Cast::Success {
                    values: nondet(columns).into_iter().map(Value::Array).collect(),
                },
                Err(items) => Cast::Failure(Failure::Tuple { length, items: Some(items), actual }),
            }
        }
        Type::Record(item) => {
            let Value::Object(entries) = actual else {
                return Cast::Failure(Failure::Record { properties: None, actual });
            };
            let properties = entries
                .iter()
                .map(|(k, v)| (k.clone(), cast_type(scope, item, v)))
                .collect();
            match split_keyed(properties) {
                Ok(values) => Cast::Success { values },
                Err(properties) => Cast::Failure(Failure::Record {
                    properties: Some(properties),
                    actual,
                }),
            }
        }
        Type::Object(fields) => {
            let Value::Object(entries) = actual else {
                return Cast::Failure(Failure::Object { properties: None, actual });
            };
            let properties = fields
                .iter()
                .map(|(k, t)| {
                    let field = entries.get(k).unwrap_or(&UNDEFINED);
                    (k.clone(), cast_type(scope, t, field))
                })
                .collect();
            match split_keyed(properties) {
                Ok(values) => Cast::Success { values },
                Err(properties) => Cast::Failure(Failure::Object {
                    properties: Some(properties),
                    actual,
                }),
            }
        }
        Type::Enumeration(values) => {
            if Literal::of(actual).is_some_and(|l| values.contains(&l)) {
                Cast::success(actual.clone())
            } else {
                Cast::Failure(Failure::Enumeration { values: values.clone(), actual })
            }
        }
        Type::Union(types) => {
            let variants: Vec<Cast<'v>> = types.iter().map(|t| cast_type(scope, t, actual)).collect();
            if variants.iter().any(Cast::is_success) {
                Cast::Success {
                    values: variants.into_iter().filter_map(Cast::into_values).flatten().collect(),
                }
            } else {
                Cast::Failure(Failure::Union { variants, actual })
            }
        }
        Type::Intersection(types) => {
            let results = types.iter().map(|t| cast_type(scope, t, actual)).collect();
            match split(results) {
                Ok(columns) => Cast::Success {
                    values: nondet(columns).into_iter().map(Value::Array).collect(),
                },
                Err(results) => Cast::Failure(Failure::Intersection { results, actual }),
            }
        }
        Type::Pure(value) => Cast::success(value.clone()),
        Type::Map { composition, inner } => match cast_type(scope, inner, actual) {
            Cast::Success { values } => {
                let pipeline = composition.assoc();
                Cast::Success { values: values.into_iter().map(|v| pipeline.feed(v)).collect() }
            }
            failed => failed,
        },
        Type::Reference(symbol) => match Scope::lookup(scope, symbol) {
            Some(body) => cast_type(scope, body, actual),
            None => {
                tracing::trace!(symbol = symbol.description(), "unbound reference");
                Cast::Unbound { symbol: symbol.clone() }
            }
        },
        Type::Recursive { symbol, body } => {
            let frame = Scope { symbol, body, parent: scope };
            cast_type(Some(&frame), body, actual)
        }
    })
}

// ------------------------------- Nondet ---------------------------------- //

/// Candidate columns if every result succeeded, otherwise the results back
/// untouched for the failure report.
fn split(results: Vec<Cast<'_>>) -> Result<Vec<Vec<Value>>, Vec<Cast<'_>>> {
    if results.iter().all(Cast::is_success) {
        Ok(results.into_iter().filter_map(Cast::into_values).collect())
    } else {
        Err(results)
    }
}

fn split_keyed(results: IndexMap<String, Cast<'_>>) -> Result<Vec<Value>, IndexMap<String, Cast<'_>>> {
    if !results.values().all(Cast::is_success) {
        return Err(results);
    }
    let (keys, columns): (Vec<String>, Vec<Vec<Value>>) = results
        .into_iter()
        .filter_map(|(k, c)| c.into_values().map(|vs| (k, vs)))
        .unzip();
    Ok(nondet(columns)
        .into_iter()
        .map(|row| Value::Object(keys.iter().cloned().zip(row).collect()))
        .collect())
}

/// Cartesian product; the first column varies slowest.
fn nondet(columns: Vec<Vec<Value>>) -> Vec<Vec<Value>> {
    let width = columns.len();
    let mut rows = vec![Vec::with_capacity(width)];
    for mut column in columns {
        // a single reading so far and a single candidate: move, don't copy
        if rows.len() == 1 && column.len() == 1 {
            rows[0].extend(column.pop());
            continue;
        }
        rows = rows
            .iter()
            .flat_map(|row| {
                column.iter().map(move |value| {
                    let mut next = row.clone();
                    next.push(value.clone());
                    next
                })
            })
            .collect();
    }
    rows
}

// ------------------------------- Tests ------------------------------------ //
