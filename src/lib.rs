//! Runtime descriptors for untyped values.
//!
//! Build a [`Type`] from the constructors in [`types`], close recursive
//! groups with [`fix`], then [`cast`] values against it. A cast keeps every
//! reading the descriptor allows, or explains precisely why none exists.
//!
//! ```
//! use json_cast::types::*;
//! use json_cast::{fix_one, Value};
//!
//! let list = fix_one("list", |list| nullable(object([("head", number()), ("tail", list)]))).unwrap();
//! let input = Value::from(serde_json::json!({"head": 1, "tail": {"head": 2, "tail": null}}));
//! assert_eq!(list.cast(&input).values().map(<[Value]>::len), Some(1));
//! ```
pub mod builtins;
pub mod cast;
pub mod document;
pub mod error;
pub mod fix;
pub mod morphism;
pub mod report;
pub mod types;
pub mod value;

mod path_de;
mod stack;

pub use cast::{cast, Cast, Failure};
pub use error::SchemaError;
pub use fix::{fix, fix_one, Fix, Group, Refs};
pub use morphism::{Composition, Morphism, Pipeline};
pub use types::{PrimitiveKind, Type};
pub use value::{Literal, Symbol, Value};
