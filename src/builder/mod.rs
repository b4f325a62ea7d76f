//! # Construction Protocol
//!
//! A producer writes its construction logic once against [`Builder`]; the
//! caller picks the concrete representation by choosing the builder.
//!
//! ## Node lifecycle
//! `make_node` → zero or more `relate` → `finish_node`. The node returned by
//! `finish_node` is what gets attached as a right node on the parent.
//!
//! ## Rebinding
//! `relate` returns the left node. Builders with persistent representations
//! return a new value, builders that mutate in place return the same handle.
//! Callers must always continue with the returned value.
//!
//! ## Sessions
//! A batch of construction calls runs inside [`with_builder`], which calls
//! `prepare`, runs the body through `wrap`, and calls `finish_session`
//! exactly once on every exit path.

use crate::node::{Initargs, Kind, Relation};
use crate::BuilderError;

pub mod compose;
pub mod session;

pub use compose::{make_finish_node, make_finish_node_relations, RelationSpec, RightSpec};
pub use session::with_builder;

/// How a construction session ended, reported to [`Builder::finish_session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The body returned `Ok`.
    Completed,
    /// The body returned `Err` or panicked.
    Aborted,
}

/// A concrete tree representation that can be constructed.
pub trait Builder {
    /// The builder's node representation.
    type Node;

    /// Creates a new, unfinished node of `kind`.
    ///
    /// Unknown kinds and initargs that do not fit the kind are construction
    /// errors.
    fn make_node(&mut self, kind: &Kind, initargs: Initargs) -> Result<Self::Node, BuilderError>;

    /// Attaches `right` to `left` under `relation` and returns the left node
    /// to continue with.
    fn relate(
        &mut self,
        relation: &Relation,
        left: Self::Node,
        right: Self::Node,
        args: Initargs,
    ) -> Result<Self::Node, BuilderError>;

    /// Marks `node` complete. `kind` must be the node's own kind.
    fn finish_node(&mut self, kind: &Kind, node: Self::Node) -> Result<Self::Node, BuilderError>;

    /// Opens a construction session.
    fn prepare(&mut self) -> Result<(), BuilderError> {
        Ok(())
    }

    /// Runs a session body. Override to install middleware around it.
    fn wrap<R, F>(&mut self, body: F) -> Result<R, BuilderError>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<R, BuilderError>,
    {
        body(self)
    }

    /// Closes a construction session. Called exactly once per successful
    /// `prepare`.
    fn finish_session(&mut self, _outcome: SessionOutcome) -> Result<(), BuilderError> {
        Ok(())
    }
}
