//! # Traversal Engine
//!
//! [`walk`] visits a built tree through an [`Introspect`] implementation,
//! calling a user visit function at each node. The visit function decides
//! how far to descend: it receives a [`Visit`] whose `recurse*` methods walk
//! into the current node's relations and return the children's results.
//!
//! ## Peeking
//! A [`Visitor`] built with [`Visitor::peeking`] consults its peek function
//! before anything else happens to a candidate node. The [`Peek`] it returns
//! can drop the node, let it through (optionally interpreted by another
//! introspector), or substitute a different node with caller-supplied kind,
//! initargs and relations. Introspection of a skipped or substituted node
//! never happens.
//!
//! ## Termination
//! The walk is a plain recursive descent on the caller's thread. It
//! terminates on acyclic relation graphs; introspectors that report cycles
//! make it recurse forever.

use crate::introspect::Introspect;
use crate::node::{Initargs, Kind, Relation};
use crate::{err_msg, BuilderError};
use tracing::trace;

type VisitFn<'w, N, R> = dyn Fn(&Visit<'_, 'w, N, R>) -> Result<R, BuilderError> + 'w;

type PeekFn<'w, N> = dyn Fn(&'w dyn Introspect<N>, Option<&Relation>, Option<&Initargs>, &N) -> Result<Peek<'w, N>, BuilderError>
    + 'w;

/// What to do with a node, decided by a peek function before the node is
/// introspected or visited.
pub enum Peek<'w, N> {
    /// Drop the node. It is not introspected or visited and its position in
    /// the parent's results holds `None`.
    Skip,
    /// Process the node normally. A supplied introspector replaces the
    /// current one for this node and its descendants.
    Continue(Option<&'w dyn Introspect<N>>),
    /// Process `node` instead, as if introspection had reported `kind`,
    /// `initargs` and `relations`. A supplied introspector replaces the
    /// current one for this node and its descendants.
    Replace {
        node: N,
        kind: Kind,
        initargs: Initargs,
        relations: Vec<Relation>,
        builder: Option<&'w dyn Introspect<N>>,
    },
}

impl<'w, N> Peek<'w, N> {
    /// Shorthand for `Peek::Continue(None)`.
    pub fn proceed() -> Self {
        Peek::Continue(None)
    }
}

/// The visit function of a walk, optionally paired with a peek function.
pub struct Visitor<'w, N, R> {
    peek: Option<Box<PeekFn<'w, N>>>,
    visit: Box<VisitFn<'w, N, R>>,
}

impl<'w, N, R> Visitor<'w, N, R> {
    pub fn new<V>(visit: V) -> Self
    where
        V: Fn(&Visit<'_, 'w, N, R>) -> Result<R, BuilderError> + 'w,
    {
        Self {
            peek: None,
            visit: Box::new(visit),
        }
    }

    /// A visitor whose `peek` runs before each node is introspected.
    ///
    /// `peek` receives the introspector currently in effect, the incoming
    /// relation and relation args (`None` for the root) and the node.
    pub fn peeking<P, V>(peek: P, visit: V) -> Self
    where
        P: Fn(&'w dyn Introspect<N>, Option<&Relation>, Option<&Initargs>, &N) -> Result<Peek<'w, N>, BuilderError>
            + 'w,
        V: Fn(&Visit<'_, 'w, N, R>) -> Result<R, BuilderError> + 'w,
    {
        Self {
            peek: Some(Box::new(peek)),
            visit: Box::new(visit),
        }
    }

    pub fn is_peeking(&self) -> bool {
        self.peek.is_some()
    }
}

/// Results of traversing one relation.
#[derive(Debug, Clone, PartialEq)]
pub enum Recursed<R> {
    /// `one` and `optional` relations. `None` when there was no right node or
    /// it was skipped.
    Single(Option<R>),
    /// `many` and `keyed` relations, one entry per right node in order.
    /// Skipped nodes hold `None`.
    Sequence(Vec<Option<R>>),
}

impl<R> Recursed<R> {
    /// Every present result, in order.
    pub fn into_values(self) -> Vec<R> {
        match self {
            Recursed::Single(result) => result.into_iter().collect(),
            Recursed::Sequence(results) => results.into_iter().flatten().collect(),
        }
    }

    pub fn as_single(&self) -> Option<&R> {
        match self {
            Recursed::Single(result) => result.as_ref(),
            Recursed::Sequence(_) => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Option<R>]> {
        match self {
            Recursed::Single(_) => None,
            Recursed::Sequence(results) => Some(results),
        }
    }
}

/// Everything a visit function learns about the node being visited, plus the
/// ability to descend into it.
pub struct Visit<'a, 'w, N, R> {
    /// The relation this node was reached through; `None` for the root.
    pub relation: Option<&'a Relation>,
    /// The args that relation was established with; `None` for the root.
    pub relation_args: Option<&'a Initargs>,
    pub node: &'a N,
    pub kind: &'a Kind,
    pub relations: &'a [Relation],
    pub initargs: &'a Initargs,
    builder: &'w dyn Introspect<N>,
    visitor: &'a Visitor<'w, N, R>,
}

impl<'a, 'w, N, R> Visit<'a, 'w, N, R> {
    /// The introspector in effect for this node.
    pub fn builder(&self) -> &'w dyn Introspect<N> {
        self.builder
    }

    pub fn is_root(&self) -> bool {
        self.relation.is_none()
    }

    /// Traverses every relation of this node.
    pub fn recurse(&self) -> Result<Vec<Recursed<R>>, BuilderError> {
        self.recurse_with(None, None)
    }

    /// Traverses the named relations, in the order given.
    pub fn recurse_relations(&self, names: &[&str]) -> Result<Vec<Recursed<R>>, BuilderError> {
        self.recurse_with(Some(names), None)
    }

    /// Traverses the named relations (all of them when `names` is `None`),
    /// visiting the children with `visitor` instead of the current visitor
    /// when one is given.
    ///
    /// The result has one entry per traversed relation. A name the node does
    /// not report yields an empty sequence.
    pub fn recurse_with(
        &self,
        names: Option<&[&str]>,
        visitor: Option<&Visitor<'w, N, R>>,
    ) -> Result<Vec<Recursed<R>>, BuilderError> {
        let visitor = visitor.unwrap_or(self.visitor);
        match names {
            None => self
                .relations
                .iter()
                .map(|relation| self.traverse(visitor, relation))
                .collect(),
            Some(names) => names
                .iter()
                .map(|name| match self.relations.iter().find(|r| r.name() == *name) {
                    Some(relation) => self.traverse(visitor, relation),
                    None => Ok(Recursed::Sequence(Vec::new())),
                })
                .collect(),
        }
    }

    fn traverse(
        &self,
        visitor: &Visitor<'w, N, R>,
        relation: &Relation,
    ) -> Result<Recursed<R>, BuilderError> {
        let related = self.builder.node_relation(relation, self.node)?;
        if relation.cardinality.is_sequence() {
            let results = related
                .iter()
                .map(|(node, args)| visit_node(self.builder, visitor, Some(relation), Some(args), node))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Recursed::Sequence(results));
        }
        if related.len() > 1 {
            return Err(err_msg!(
                Cardinality,
                "relation '{}' is {} but introspection reported {} right nodes",
                relation.name(),
                relation.cardinality,
                related.len()
            ));
        }
        let result = match related.first() {
            Some((node, args)) => visit_node(self.builder, visitor, Some(relation), Some(args), node)?,
            None => None,
        };
        Ok(Recursed::Single(result))
    }
}

/// Walks the tree rooted at `root`, returning what the visit function returns
/// for the root.
///
/// The result is `None` only when a peek function skips the root. Errors
/// from introspection, visit or peek functions abort the walk and are
/// returned unchanged.
///
/// # Examples
///
/// ```rust
/// use arbor::builder::{make_finish_node, make_finish_node_relations, RelationSpec, RightSpec};
/// use arbor::list::ListBuilder;
/// use arbor::node::Initargs;
/// use arbor::walk::{walk, Visitor};
///
/// let mut builder = ListBuilder::new();
/// let leaf = make_finish_node(&mut builder, "literal", Initargs::new().with("value", 5)).unwrap();
/// let root = make_finish_node_relations(
///     &mut builder,
///     "negate",
///     Initargs::new(),
///     vec![RelationSpec::one("operand", RightSpec::node(leaf))],
/// )
/// .unwrap();
///
/// let count: Visitor<'_, _, usize> = Visitor::new(|visit| {
///     let mut total = 1;
///     for child in visit.recurse()? {
///         total += child.into_values().into_iter().sum::<usize>();
///     }
///     Ok(total)
/// });
/// assert_eq!(walk(&builder, &count, &root).unwrap(), Some(2));
/// ```
pub fn walk<'w, B, N, R>(
    builder: &'w B,
    visitor: &Visitor<'w, N, R>,
    root: &N,
) -> Result<Option<R>, BuilderError>
where
    B: Introspect<N> + 'w,
{
    visit_node(builder, visitor, None, None, root)
}

fn visit_node<'w, N, R>(
    builder: &'w dyn Introspect<N>,
    visitor: &Visitor<'w, N, R>,
    relation: Option<&Relation>,
    relation_args: Option<&Initargs>,
    node: &N,
) -> Result<Option<R>, BuilderError> {
    let peeked = match &visitor.peek {
        Some(peek) => peek(builder, relation, relation_args, node)?,
        None => Peek::Continue(None),
    };
    match peeked {
        Peek::Skip => {
            trace!(relation = ?relation.map(Relation::name), "peek skipped node");
            Ok(None)
        }
        Peek::Continue(replacement) => {
            let builder = replacement.unwrap_or(builder);
            let kind = builder.node_kind(node)?;
            let relations = builder.node_relations(node)?;
            let initargs = builder.node_initargs(node)?;
            let visit = Visit {
                relation,
                relation_args,
                node,
                kind: &kind,
                relations: &relations,
                initargs: &initargs,
                builder,
                visitor,
            };
            invoke(&visit).map(Some)
        }
        Peek::Replace {
            node: substitute,
            kind,
            initargs,
            relations,
            builder: replacement,
        } => {
            let visit = Visit {
                relation,
                relation_args,
                node: &substitute,
                kind: &kind,
                relations: &relations,
                initargs: &initargs,
                builder: replacement.unwrap_or(builder),
                visitor,
            };
            invoke(&visit).map(Some)
        }
    }
}

fn invoke<N, R>(visit: &Visit<'_, '_, N, R>) -> Result<R, BuilderError> {
    trace!(
        kind = %visit.kind,
        relation = ?visit.relation.map(Relation::name),
        relations = visit.relations.len(),
        "visiting node"
    );
    (visit.visitor.visit)(visit)
}
