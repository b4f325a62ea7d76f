//! Composite construction steps.
//!
//! [`make_finish_node_relations`] is the backbone nested construction reduces
//! to: make a node, produce and relate every right node its relation specs
//! describe, finish it. Right-node producers run after the parent exists, so
//! a producer is free to build a whole subtree with the same builder.

use super::Builder;
use crate::node::{Cardinality, Initargs, Kind, Relation, Value};
use crate::{err_msg, BuilderError};
use tracing::trace;

/// One right node of a relation: how to produce it and the relation args to
/// attach it with.
pub struct RightSpec<'a, B: Builder + ?Sized> {
    produce: Box<dyn FnOnce(&mut B) -> Result<B::Node, BuilderError> + 'a>,
    args: Initargs,
}

impl<'a, B: Builder + ?Sized> RightSpec<'a, B> {
    /// A right node built on demand, after its parent has been made.
    pub fn build<F>(produce: F) -> Self
    where
        F: FnOnce(&mut B) -> Result<B::Node, BuilderError> + 'a,
    {
        Self {
            produce: Box::new(produce),
            args: Initargs::new(),
        }
    }

    /// An already finished right node.
    pub fn node(node: B::Node) -> Self
    where
        B::Node: 'a,
    {
        Self::build(move |_| Ok(node))
    }

    /// Relation args for this right node, appended after any already set.
    pub fn with_args(mut self, args: Initargs) -> Self {
        self.args.extend_from(&args);
        self
    }

    pub fn args(&self) -> &Initargs {
        &self.args
    }
}

/// A relation to establish during [`make_finish_node_relations`].
///
/// # Examples
///
/// ```rust
/// use arbor::builder::{make_finish_node, make_finish_node_relations, RelationSpec, RightSpec};
/// use arbor::list::ListBuilder;
/// use arbor::node::Initargs;
///
/// let mut builder = ListBuilder::new();
/// let sum = make_finish_node_relations(
///     &mut builder,
///     "operator",
///     Initargs::new().with("name", "+"),
///     vec![RelationSpec::many(
///         "operand",
///         [5, 6].map(|n| {
///             RightSpec::build(move |b: &mut ListBuilder| {
///                 make_finish_node(b, "literal", Initargs::new().with("value", n))
///             })
///         }),
///     )],
/// )
/// .unwrap();
/// assert_eq!(sum.relation("operand").map(|r| r.len()), Some(2));
/// ```
pub struct RelationSpec<'a, B: Builder + ?Sized> {
    relation: Relation,
    rights: Vec<RightSpec<'a, B>>,
}

impl<'a, B: Builder + ?Sized> RelationSpec<'a, B> {
    pub fn new(relation: Relation, rights: impl IntoIterator<Item = RightSpec<'a, B>>) -> Self {
        Self {
            relation,
            rights: rights.into_iter().collect(),
        }
    }

    pub fn one(name: &str, right: RightSpec<'a, B>) -> Self {
        Self::new(Relation::one(name), [right])
    }

    pub fn optional(name: &str, right: Option<RightSpec<'a, B>>) -> Self {
        Self::new(Relation::optional(name), right)
    }

    pub fn many(name: &str, rights: impl IntoIterator<Item = RightSpec<'a, B>>) -> Self {
        Self::new(Relation::many(name), rights)
    }

    /// Keyed relation; each right node's key value is stored in its relation
    /// args under `key`, ahead of any other args.
    pub fn keyed<V>(
        name: &str,
        key: &str,
        rights: impl IntoIterator<Item = (V, RightSpec<'a, B>)>,
    ) -> Self
    where
        V: Into<Value>,
    {
        let rights = rights.into_iter().map(|(value, right)| {
            let mut args = Initargs::new().with(key, value);
            args.extend_from(&right.args);
            RightSpec { args, ..right }
        });
        Self::new(Relation::keyed(name, key), rights)
    }

    /// Extra relation args appended to every right node of this relation.
    pub fn with_args(mut self, args: Initargs) -> Self {
        for right in &mut self.rights {
            right.args.extend_from(&args);
        }
        self
    }

    pub fn relation(&self) -> &Relation {
        &self.relation
    }

    pub fn len(&self) -> usize {
        self.rights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rights.is_empty()
    }

    /// Checks the number of right nodes and key uniqueness without producing
    /// anything.
    pub fn validate(&self) -> Result<(), BuilderError> {
        let name = self.relation.name();
        let count = self.rights.len();
        match &self.relation.cardinality {
            Cardinality::One if count != 1 => Err(err_msg!(
                Cardinality,
                "relation '{}' is one but {} right nodes were supplied",
                name,
                count
            )),
            Cardinality::Optional if count > 1 => Err(err_msg!(
                Cardinality,
                "relation '{}' is optional but {} right nodes were supplied",
                name,
                count
            )),
            cardinality @ Cardinality::Keyed(_) => {
                for (i, right) in self.rights.iter().enumerate() {
                    let earlier = self.rights[..i].iter().map(|r| &r.args);
                    cardinality.admit(name, earlier, &right.args)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Makes and immediately finishes a node without relations.
pub fn make_finish_node<B>(
    builder: &mut B,
    kind: impl Into<Kind>,
    initargs: Initargs,
) -> Result<B::Node, BuilderError>
where
    B: Builder + ?Sized,
{
    let kind = kind.into();
    let node = builder.make_node(&kind, initargs)?;
    builder.finish_node(&kind, node)
}

/// Makes a node, establishes every relation in `relations`, then finishes it.
///
/// All specs are validated before the node is made. Right nodes are produced
/// and related in spec order, then in the order given within each spec.
pub fn make_finish_node_relations<'a, B>(
    builder: &mut B,
    kind: impl Into<Kind>,
    initargs: Initargs,
    relations: Vec<RelationSpec<'a, B>>,
) -> Result<B::Node, BuilderError>
where
    B: Builder + ?Sized,
{
    let kind = kind.into();
    for spec in &relations {
        spec.validate()?;
    }
    let mut node = builder.make_node(&kind, initargs)?;
    for spec in relations {
        let RelationSpec { relation, rights } = spec;
        trace!(%kind, relation = %relation, rights = rights.len(), "relating");
        for RightSpec { produce, args } in rights {
            let right = produce(&mut *builder)?;
            node = builder.relate(&relation, node, right, args)?;
        }
    }
    builder.finish_node(&kind, node)
}
