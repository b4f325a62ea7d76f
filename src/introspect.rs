//! # Introspection Protocol
//!
//! The read-side counterpart of [`Builder`](crate::builder::Builder): given
//! a node it created, an introspector reports the node's kind, initargs,
//! relations and related nodes. The walker only ever looks at nodes through
//! this trait, so any representation that implements it can be traversed.
//!
//! ## Contract
//! - `node_kind` and `node_initargs` return what the node was made with.
//! - `node_relations` lists each relation once, in first-establishment
//!   order. Introspectors that do not track cardinalities report `many`.
//! - `node_relation` returns the right nodes of one relation together with
//!   the relation args each was attached with, in establishment order.
//! - The relation graph must be acyclic; the walker does not check.

use crate::node::{Initargs, Kind, Relation};
use crate::{err_msg, BuilderError};

/// Read access to nodes of type `N`.
pub trait Introspect<N> {
    fn node_kind(&self, node: &N) -> Result<Kind, BuilderError>;

    fn node_initargs(&self, node: &N) -> Result<Initargs, BuilderError>;

    fn node_relations(&self, node: &N) -> Result<Vec<Relation>, BuilderError>;

    fn node_relation(&self, relation: &Relation, node: &N) -> Result<Related<N>, BuilderError>;
}

impl<N, T: Introspect<N> + ?Sized> Introspect<N> for &T {
    fn node_kind(&self, node: &N) -> Result<Kind, BuilderError> {
        (**self).node_kind(node)
    }

    fn node_initargs(&self, node: &N) -> Result<Initargs, BuilderError> {
        (**self).node_initargs(node)
    }

    fn node_relations(&self, node: &N) -> Result<Vec<Relation>, BuilderError> {
        (**self).node_relations(node)
    }

    fn node_relation(&self, relation: &Relation, node: &N) -> Result<Related<N>, BuilderError> {
        (**self).node_relation(relation, node)
    }
}

/// The right nodes of one relation and the relation args each was attached
/// with, as two parallel sequences of equal length.
///
/// # Examples
///
/// ```rust
/// use arbor::introspect::Related;
/// use arbor::node::Initargs;
///
/// let related: Related<&str> = [("a", Initargs::new()), ("b", Initargs::new().with("key", 1))]
///     .into_iter()
///     .collect();
/// assert_eq!(related.nodes(), &["a", "b"]);
/// assert_eq!(related.args()[1].get("key").and_then(|v| v.as_number()), Some(1.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Related<N> {
    nodes: Vec<N>,
    args: Vec<Initargs>,
}

impl<N> Related<N> {
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            args: Vec::new(),
        }
    }

    /// Builds from separate sequences, which must have equal length.
    pub fn from_parallel(nodes: Vec<N>, args: Vec<Initargs>) -> Result<Self, BuilderError> {
        if nodes.len() != args.len() {
            return Err(err_msg!(
                Internal,
                "{} related nodes but {} relation args",
                nodes.len(),
                args.len()
            ));
        }
        Ok(Self { nodes, args })
    }

    pub fn push(&mut self, node: N, args: Initargs) {
        self.nodes.push(node);
        self.args.push(args);
    }

    pub fn nodes(&self) -> &[N] {
        &self.nodes
    }

    pub fn args(&self) -> &[Initargs] {
        &self.args
    }

    pub fn iter(&self) -> impl Iterator<Item = (&N, &Initargs)> {
        self.nodes.iter().zip(self.args.iter())
    }

    pub fn first(&self) -> Option<(&N, &Initargs)> {
        self.iter().next()
    }

    pub fn into_parts(self) -> (Vec<N>, Vec<Initargs>) {
        (self.nodes, self.args)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<N> Default for Related<N> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<N> FromIterator<(N, Initargs)> for Related<N> {
    fn from_iter<I: IntoIterator<Item = (N, Initargs)>>(iter: I) -> Self {
        let (nodes, args) = iter.into_iter().unzip();
        Self { nodes, args }
    }
}

impl<N> IntoIterator for Related<N> {
    type Item = (N, Initargs);
    type IntoIter = std::iter::Zip<std::vec::IntoIter<N>, std::vec::IntoIter<Initargs>>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter().zip(self.args)
    }
}
