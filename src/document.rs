//! Schema documents: the descriptor algebra written as JSON.
//!
//! ```json
//! {
//!   "root": {"array": {"ref": "list"}},
//!   "definitions": {
//!     "list": {"nullable": {"object": {"head": "number", "tail": {"ref": "list"}}}}
//!   }
//! }
//! ```
//!
//! Atoms are bare strings (`"unknown"`, `"never"`, or a primitive kind).
//! Every other node is a single-key object naming its constructor.
//! Definitions are closed together, so they may refer to each other freely;
//! the root may refer to any definition.
use indexmap::IndexMap;
use serde::Deserialize;

use crate::builtins;
use crate::error::SchemaError;
use crate::fix::Group;
use crate::types::{self, Type};
use crate::value::{Literal, Symbol, Value};

// -------------------------------- Nodes ---------------------------------- //

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Atom(String),
    Compound(Compound),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compound {
    Array(Box<Node>),
    Tuple(Vec<Node>),
    Record(Box<Node>),
    Object(IndexMap<String, Node>),
    Enum(Vec<serde_json::Value>),
    Union(Vec<Node>),
    Intersection(Vec<Node>),
    Nullable(Box<Node>),
    Optional(Box<Node>),
    Pure(serde_json::Value),
    Map(MapNode),
    Ref(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapNode {
    pub morphism: String,
    pub of: Box<Node>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDocument {
    pub root: Node,
    #[serde(default)]
    pub definitions: IndexMap<String, Node>,
}

/// A compiled document: closed root plus every closed definition.
#[derive(Debug, Clone)]
pub struct Schema {
    pub root: Type,
    pub definitions: IndexMap<String, Type>,
}

// ------------------------------- Front API -------------------------------- //

pub fn load(src: &str) -> Result<Schema, SchemaError> {
    crate::path_de::from_str_with_path::<SchemaDocument>(src)?.compile()
}

pub fn load_slice(bytes: &[u8]) -> Result<Schema, SchemaError> {
    crate::path_de::from_slice_with_path::<SchemaDocument>(bytes)?.compile()
}

impl SchemaDocument {
    pub fn compile(&self) -> Result<Schema, SchemaError> {
        let lowering = Lowering {
            symbols: self.definitions.keys().map(|name| (name.as_str(), Symbol::new(name))).collect(),
        };

        let mut group = Group::new();
        for (name, node) in &self.definitions {
            group.bind(lowering.symbols[name.as_str()].clone(), lowering.lower(node)?)?;
        }

        let definitions = lowering
            .symbols
            .iter()
            .map(|(name, symbol)| Ok((name.to_string(), group.close(symbol)?)))
            .collect::<Result<IndexMap<_, _>, SchemaError>>()?;
        let root = group.close_type(&lowering.lower(&self.root)?)?;
        tracing::debug!(definitions = definitions.len(), binders = root.binders(), "compiled schema document");
        Ok(Schema { root, definitions })
    }
}

// ------------------------------- Lowering -------------------------------- //

struct Lowering<'d> {
    symbols: IndexMap<&'d str, Symbol>,
}

impl Lowering<'_> {
    fn lower(&self, node: &Node) -> Result<Type, SchemaError> {
        let compound = match node {
            Node::Atom(tag) => {
                return match tag.as_str() {
                    "unknown" => Ok(types::unknown()),
                    "never" => Ok(types::never()),
                    kind => Ok(types::primitive(kind.parse()?)),
                };
            }
            Node::Compound(compound) => compound,
        };
        Ok(match compound {
            Compound::Array(item) => types::array(self.lower(item)?),
            Compound::Tuple(items) => types::tuple(self.lower_all(items)?),
            Compound::Record(item) => types::record(self.lower(item)?),
            Compound::Object(fields) => types::object(
                fields
                    .iter()
                    .map(|(k, n)| Ok((k.clone(), self.lower(n)?)))
                    .collect::<Result<Vec<_>, SchemaError>>()?,
            ),
            Compound::Enum(literals) => types::enumeration(
                literals.iter().map(Literal::try_from).collect::<Result<Vec<_>, _>>()?,
            ),
            Compound::Union(members) => types::union(self.lower_all(members)?),
            Compound::Intersection(members) => types::intersection(self.lower_all(members)?),
            Compound::Nullable(inner) => types::nullable(self.lower(inner)?),
            Compound::Optional(inner) => types::optional(self.lower(inner)?),
            Compound::Pure(value) => types::pure(Value::from(value.clone())),
            Compound::Map(MapNode { morphism, of }) => {
                types::map_with(builtins::lookup(morphism)?, self.lower(of)?)
            }
            Compound::Ref(name) => match self.symbols.get(name.as_str()) {
                Some(symbol) => types::reference(symbol.clone()),
                None => return Err(SchemaError::UndefinedName(name.clone())),
            },
        })
    }

    fn lower_all(&self, nodes: &[Node]) -> Result<Vec<Type>, SchemaError> {
        nodes.iter().map(|n| self.lower(n)).collect()
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn compile(doc: serde_json::Value) -> Result<Schema, SchemaError> {
        load(&doc.to_string())
    }

    #[test]
    fn recursive_definitions_close_through_fix() {
        let schema = compile(json!({
            "root": {"array": {"ref": "list"}},
            "definitions": {
                "list": {"nullable": {"object": {"head": "number", "tail": {"ref": "list"}}}}
            }
        }))
        .unwrap();
        assert_eq!(schema.definitions["list"].binders(), 1);
        assert_eq!(
            schema.root.to_string(),
            "array<μlist. ({ head: number, tail: list } | null)>"
        );
        let input = Value::from(json!([null, {"head": 1, "tail": {"head": 2, "tail": null}}]));
        assert!(schema.root.cast(&input).is_success());
    }

    #[test]
    fn every_constructor_has_a_spelling() {
        let schema = compile(json!({
            "root": {"tuple": [
                "string",
                {"record": "boolean"},
                {"enum": ["a", 1, null, true]},
                {"union": ["null", "undefined"]},
                {"optional": "bigint"},
                {"pure": {"k": [1]}},
                {"map": {"morphism": "length", "of": "string"}},
                {"map": {"morphism": "merge", "of": {"intersection": [
                    {"object": {"a": "number"}},
                    {"object": {"b": "unknown"}}
                ]}}},
                "never"
            ]}
        }))
        .unwrap();
        assert_eq!(
            schema.root.to_string(),
            concat!(
                r#"[string, record<boolean>, enum("a" | 1 | null | true), (null | undefined), "#,
                r#"(bigint | undefined), pure({"k": [1]}), map[1](string), "#,
                r#"map[1](({ a: number } & { b: unknown })), never]"#,
            )
        );
    }

    #[test]
    fn merge_reconstructs_one_object() {
        let schema = compile(json!({
            "root": {"map": {"morphism": "merge", "of": {"intersection": [
                {"object": {"a": "number"}},
                {"object": {"b": "string"}}
            ]}}}
        }))
        .unwrap();
        let input = Value::from(json!({"a": 1, "b": "x", "c": null}));
        let result = schema.root.cast(&input);
        assert_eq!(result.to_json(), json!({"status": "success", "values": [{"a": 1, "b": "x"}]}));
    }

    #[test]
    fn construction_errors_surface() {
        assert_eq!(
            compile(json!({"root": "integer"})).unwrap_err(),
            SchemaError::UnknownPrimitive("integer".into())
        );
        assert_eq!(
            compile(json!({"root": {"ref": "missing"}})).unwrap_err(),
            SchemaError::UndefinedName("missing".into())
        );
        assert_eq!(
            compile(json!({"root": {"enum": [[1]]}})).unwrap_err(),
            SchemaError::InvalidLiteral("[1]".into())
        );
        assert_eq!(
            compile(json!({"root": {"map": {"morphism": "reverse", "of": "string"}}})).unwrap_err(),
            SchemaError::UnknownMorphism("reverse".into())
        );
    }

    #[test]
    fn unguarded_definitions_are_rejected() {
        let err = compile(json!({
            "root": {"ref": "a"},
            "definitions": {"a": {"nullable": {"ref": "a"}}}
        }))
        .unwrap_err();
        assert_eq!(err, SchemaError::UnguardedRecursion("a".into()));
    }

    #[test]
    fn malformed_documents_report_a_path() {
        let err = compile(json!({"root": "string", "defs": {}})).unwrap_err();
        assert!(matches!(err, SchemaError::Document { .. }), "{err:?}");

        let err = compile(json!({"root": "string", "definitions": {"a": {"tuple": 3}}})).unwrap_err();
        let SchemaError::Document { path, .. } = err else { panic!("expected document error") };
        assert_eq!(path, "definitions.a");
    }

    #[test]
    fn slices_load_like_strings() {
        let schema = load_slice(br#"{"root": {"array": "number"}}"#).unwrap();
        assert!(schema.definitions.is_empty());
        assert!(schema.root.cast(&Value::from(json!([1, 2]))).is_success());
    }
}
