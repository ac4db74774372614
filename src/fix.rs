//! Closing groups of mutually recursive definitions.
//!
//! Each definition is a combinator that receives a placeholder `reference`
//! for every name in the group (its own included). The raw bodies are then
//! walked bottom-up, tracking the free symbols of every subexpression, and a
//! `recursive` binder is put exactly where a cycle closes:
//!
//! - a reference to a group name not currently being expanded is replaced by
//!   that name's body, walked with the name marked as expanding;
//! - a reference to a name already being expanded stays a reference and is
//!   free;
//! - after the substituted body is walked, if its own name is still free the
//!   result is wrapped in `recursive(name, ...)` and the name is dropped from
//!   the free set; otherwise it is returned as is.
//!
//! So a name that only looks up a non-cyclic sibling gets no binder at all.
//! A binder whose symbol is reachable from its body through unions,
//! intersections and maps alone is rejected as unguarded.
use std::cell::RefCell;

use indexmap::{IndexMap, IndexSet};

use crate::error::SchemaError;
use crate::stack::ensure_sufficient_stack;
use crate::types::{recursive, reference, Type};
use crate::value::Symbol;

// ------------------------------- Group ----------------------------------- //

/// Raw bodies keyed by the symbol their placeholders reference.
#[derive(Debug, Default)]
pub struct Group {
    bodies: IndexMap<Symbol, Type>,
}

/// A rewritten descriptor and the symbols it still leaves free.
struct Spun {
    ty: Type,
    free: IndexSet<Symbol>,
}

impl Spun {
    fn closed(ty: Type) -> Self {
        Spun { ty, free: IndexSet::new() }
    }

    fn rewrap(self, f: impl FnOnce(Type) -> Type) -> Self {
        Spun { ty: f(self.ty), free: self.free }
    }
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, symbol: Symbol, body: Type) -> Result<(), SchemaError> {
        if self.bodies.contains_key(&symbol) {
            return Err(SchemaError::DuplicateName(symbol.description().to_owned()));
        }
        self.bodies.insert(symbol, body);
        Ok(())
    }

    /// Closed descriptor for one member of the group.
    pub fn close(&self, symbol: &Symbol) -> Result<Type, SchemaError> {
        self.close_type(&reference(symbol.clone()))
    }

    /// Close an arbitrary descriptor over this group. Group members it
    /// mentions are substituted; anything still free afterwards is dangling.
    pub fn close_type(&self, ty: &Type) -> Result<Type, SchemaError> {
        let Spun { ty, free } = self.spin(&mut Vec::new(), ty)?;
        match free.first() {
            Some(symbol) => Err(SchemaError::DanglingReference(symbol.description().to_owned())),
            None => Ok(ty),
        }
    }

    fn spin(&self, expanding: &mut Vec<Symbol>, ty: &Type) -> Result<Spun, SchemaError> {
        ensure_sufficient_stack(|| -> Result<Spun, SchemaError> {
            Ok(match ty {
                Type::Unknown
                | Type::Never
                | Type::Primitive(_)
                | Type::Enumeration(_)
                | Type::Pure(_) => Spun::closed(ty.clone()),
                Type::Array(item) => self.spin(expanding, item)?.rewrap(|t| Type::Array(Box::new(t))),
                Type::Record(item) => self.spin(expanding, item)?.rewrap(|t| Type::Record(Box::new(t))),
                Type::Tuple(types) => {
                    let (types, free) = self.spin_all(expanding, types)?;
                    Spun { ty: Type::Tuple(types), free }
                }
                Type::Union(types) => {
                    let (types, free) = self.spin_all(expanding, types)?;
                    Spun { ty: Type::Union(types), free }
                }
                Type::Intersection(types) => {
                    let (types, free) = self.spin_all(expanding, types)?;
                    Spun { ty: Type::Intersection(types), free }
                }
                Type::Object(fields) => {
                    let mut free = IndexSet::new();
                    let mut spun_fields = IndexMap::with_capacity(fields.len());
                    for (k, t) in fields {
                        let spun = self.spin(expanding, t)?;
                        free.extend(spun.free);
                        spun_fields.insert(k.clone(), spun.ty);
                    }
                    Spun { ty: Type::Object(spun_fields), free }
                }
                Type::Map { composition, inner } => self.spin(expanding, inner)?.rewrap(|t| Type::Map {
                    composition: composition.clone(),
                    inner: Box::new(t),
                }),
                Type::Reference(symbol) => match self.bodies.get(symbol) {
                    Some(body) if !expanding.contains(symbol) => {
                        tracing::trace!(symbol = symbol.description(), "expanding reference");
                        self.bind_cycle(expanding, symbol, body)?
                    }
                    _ => Spun { ty: ty.clone(), free: IndexSet::from([symbol.clone()]) },
                },
                // binders from an earlier, independent closure
                Type::Recursive { symbol, body } => self.bind_cycle(expanding, symbol, body)?,
            })
        })
    }

    fn spin_all(
        &self,
        expanding: &mut Vec<Symbol>,
        types: &[Type],
    ) -> Result<(Vec<Type>, IndexSet<Symbol>), SchemaError> {
        let mut free = IndexSet::new();
        let mut spun_types = Vec::with_capacity(types.len());
        for t in types {
            let spun = self.spin(expanding, t)?;
            free.extend(spun.free);
            spun_types.push(spun.ty);
        }
        Ok((spun_types, free))
    }

    fn bind_cycle(&self, expanding: &mut Vec<Symbol>, symbol: &Symbol, body: &Type) -> Result<Spun, SchemaError> {
        expanding.push(symbol.clone());
        let spun = self.spin(expanding, body);
        expanding.pop();
        let mut spun = spun?;
        if !spun.free.shift_remove(symbol) {
            return Ok(spun);
        }
        if reaches_unguarded(&spun.ty, symbol) {
            return Err(SchemaError::UnguardedRecursion(symbol.description().to_owned()));
        }
        Ok(spun.rewrap(|t| recursive(symbol.clone(), t)))
    }
}

/// Whether `symbol` occurs in `ty` without an array, tuple, record or object
/// between it and the root. Such a binder would re-enter itself on the same
/// input forever.
fn reaches_unguarded(ty: &Type, symbol: &Symbol) -> bool {
    ensure_sufficient_stack(|| match ty {
        Type::Reference(s) => s == symbol,
        Type::Union(types) | Type::Intersection(types) => {
            types.iter().any(|t| reaches_unguarded(t, symbol))
        }
        Type::Map { inner, .. } => reaches_unguarded(inner, symbol),
        Type::Recursive { symbol: bound, body } => bound != symbol && reaches_unguarded(body, symbol),
        Type::Unknown
        | Type::Never
        | Type::Primitive(_)
        | Type::Enumeration(_)
        | Type::Pure(_)
        | Type::Array(_)
        | Type::Tuple(_)
        | Type::Record(_)
        | Type::Object(_) => false,
    })
}

// ------------------------------ Combinators ------------------------------ //

/// Placeholders handed to every combinator of a `fix` group.
pub struct Refs {
    placeholders: IndexMap<String, Symbol>,
    missing: RefCell<Vec<String>>,
}

impl Refs {
    /// Placeholder for `name`. Asking for a name outside the group is
    /// recorded and fails the whole `fix`.
    pub fn get(&self, name: &str) -> Type {
        match self.placeholders.get(name) {
            Some(symbol) => reference(symbol.clone()),
            None => {
                self.missing.borrow_mut().push(name.to_owned());
                reference(Symbol::new(name))
            }
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.placeholders.keys().map(String::as_str)
    }
}

type Combinator<'f> = Box<dyn FnOnce(&Refs) -> Type + 'f>;

/// Builder form of [`fix`].
///
/// ```
/// use json_cast::fix::Fix;
/// use json_cast::types::*;
///
/// let closed = Fix::new()
///     .define("tree", |r| object([("value", number()), ("children", array(r.get("tree")))]))
///     .close()
///     .unwrap();
/// assert_eq!(closed["tree"].binders(), 1);
/// ```
#[derive(Default)]
pub struct Fix<'f> {
    combinators: Vec<(String, Combinator<'f>)>,
}

impl<'f> Fix<'f> {
    pub fn new() -> Self {
        Self { combinators: Vec::new() }
    }

    pub fn define(mut self, name: impl Into<String>, combinator: impl FnOnce(&Refs) -> Type + 'f) -> Self {
        self.combinators.push((name.into(), Box::new(combinator)));
        self
    }

    /// Closed descriptors, in definition order.
    #[tracing::instrument(level = "debug", skip_all, fields(names = self.combinators.len()))]
    pub fn close(self) -> Result<IndexMap<String, Type>, SchemaError> {
        let mut placeholders = IndexMap::new();
        for (name, _) in &self.combinators {
            if placeholders.insert(name.clone(), Symbol::new(name)).is_some() {
                return Err(SchemaError::DuplicateName(name.clone()));
            }
        }
        let refs = Refs { placeholders, missing: RefCell::default() };

        let mut group = Group::new();
        for (name, combinator) in self.combinators {
            let body = combinator(&refs);
            group.bind(refs.placeholders[&name].clone(), body)?;
        }
        if let Some(name) = refs.missing.borrow().first() {
            return Err(SchemaError::UndefinedName(name.clone()));
        }

        let closed = refs
            .placeholders
            .iter()
            .map(|(name, symbol)| Ok((name.clone(), group.close(symbol)?)))
            .collect::<Result<IndexMap<_, _>, SchemaError>>()?;
        tracing::debug!(
            binders = closed.values().map(Type::binders).sum::<usize>(),
            "closed recursive group"
        );
        Ok(closed)
    }
}

/// Close a group of mutually recursive combinators.
pub fn fix<'f, I, N, F>(combinators: I) -> Result<IndexMap<String, Type>, SchemaError>
where
    I: IntoIterator<Item = (N, F)>,
    N: Into<String>,
    F: FnOnce(&Refs) -> Type + 'f,
{
    combinators
        .into_iter()
        .fold(Fix::new(), |group, (name, combinator)| group.define(name, combinator))
        .close()
}

/// Close a single self-referential combinator.
pub fn fix_one(name: &str, combinator: impl FnOnce(Type) -> Type) -> Result<Type, SchemaError> {
    let me = Symbol::new(name);
    let mut group = Group::new();
    group.bind(me.clone(), combinator(reference(me.clone())))?;
    group.close(&me)
}

// ------------------------------- Tests ------------------------------------ //
