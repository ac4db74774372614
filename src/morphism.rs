//! Flat morphism sequences.
//!
//! Layering `map` over `map` extends one `Composition` instead of nesting
//! closures, so a cast runs every transform of a node in a single pass per
//! candidate value.
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::value::Value;

pub type Morphism = Arc<dyn Fn(Value) -> Value + Send + Sync>;

// ------------------------------- Pipeline -------------------------------- //

/// Morphisms in run order (front runs first).
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: VecDeque<Morphism>,
}

impl Pipeline {
    pub fn tap() -> Self {
        Self::default()
    }

    /// `morphism` runs before everything already in `pipeline`.
    pub fn pipe(morphism: Morphism, mut pipeline: Pipeline) -> Pipeline {
        pipeline.stages.push_front(morphism);
        pipeline
    }

    pub fn feed(&self, value: Value) -> Value {
        self.stages.iter().fold(value, |acc, stage| stage(acc))
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").field("stages", &self.stages.len()).finish()
    }
}

// ------------------------------ Composition ------------------------------ //

/// Persistent latest-first list. `compose` is O(1) and shares the tail, so
/// descriptors built from a common base never copy each other's transforms.
#[derive(Clone, Default)]
pub struct Composition {
    head: Option<Arc<Link>>,
    len: usize,
}

struct Link {
    morphism: Morphism,
    rest: Option<Arc<Link>>,
}

impl Composition {
    pub fn id() -> Self {
        Self::default()
    }

    /// `morphism` runs after everything already in `composition`.
    pub fn compose(morphism: Morphism, composition: Composition) -> Composition {
        Composition {
            head: Some(Arc::new(Link { morphism, rest: composition.head })),
            len: composition.len + 1,
        }
    }

    /// Re-associate into run order.
    pub fn assoc(&self) -> Pipeline {
        let mut pipeline = Pipeline::tap();
        let mut link = self.head.as_deref();
        while let Some(l) = link {
            pipeline = Pipeline::pipe(l.morphism.clone(), pipeline);
            link = l.rest.as_deref();
        }
        pipeline
    }

    pub fn apply(&self) -> Morphism {
        let pipeline = self.assoc();
        Arc::new(move |value| pipeline.feed(value))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composition").field("len", &self.len).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::strategy::arb_value;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn wrap(tag: &'static str) -> Morphism {
        Arc::new(move |v| Value::Array(vec![Value::from(tag), v]))
    }

    proptest! {
        #[test]
        fn id_is_identity(input in arb_value()) {
            prop_assert_eq!(Composition::id().apply()(input.clone()), input);
        }

        #[test]
        fn compose_runs_in_layering_order(input in arb_value()) {
            let first = wrap("first");
            let second = wrap("second");
            let composed = Composition::compose(second.clone(), Composition::compose(first.clone(), Composition::id()));
            prop_assert_eq!(composed.apply()(input.clone()), second(first(input)));
        }
    }

    #[test]
    fn pipe_runs_front_first() {
        let pipeline = Pipeline::pipe(wrap("a"), Pipeline::pipe(wrap("b"), Pipeline::tap()));
        assert_eq!(pipeline.len(), 2);
        let out = pipeline.feed(Value::Null);
        assert_eq!(out.to_string(), r#"["b", ["a", null]]"#);
    }

    #[test]
    fn compositions_share_their_base() {
        let base = Composition::compose(wrap("base"), Composition::id());
        let left = Composition::compose(wrap("left"), base.clone());
        let right = Composition::compose(wrap("right"), base.clone());
        assert_eq!(base.len(), 1);
        assert_eq!(left.apply()(Value::Null).to_string(), r#"["left", ["base", null]]"#);
        assert_eq!(right.apply()(Value::Null).to_string(), r#"["right", ["base", null]]"#);
    }

    #[test]
    fn long_compositions_stay_flat() {
        let inc: Morphism = Arc::new(|v| match v {
            Value::Number(n) => Value::Number(n + 1.0),
            other => other,
        });
        let composed = (0..1000).fold(Composition::id(), |acc, _| Composition::compose(inc.clone(), acc));
        assert_eq!(composed.assoc().len(), 1000);
        assert_eq!(composed.apply()(Value::from(0)), Value::from(1000));
    }
}
