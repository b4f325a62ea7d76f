//! # Arena Builder
//!
//! Stores nodes in a flat arena and hands out [`NodeId`] handles. `relate`
//! mutates the left node in place and returns the same handle.
//!
//! ## Lifecycle checks
//! - Relations may only be established from unfinished nodes.
//! - A node is finished at most once, with its own kind.
//! - With a [`Schema`] attached, kinds, initargs and relations are validated
//!   and `one` relations must be filled by the time a node is finished.
//!
//! ## Sessions
//! Sessions are transactional and may nest. `prepare` records the arena
//! length, and the first mutation of an older node inside the session saves
//! its prior state. When the session closes after an abort or with a node
//! left unfinished, nodes created since the mark are discarded and saved
//! nodes are restored.

use crate::builder::{Builder, SessionOutcome};
use crate::introspect::{Introspect, Related};
use crate::node::{Initargs, Kind, Relation};
use crate::schema::Schema;
use crate::{err_ctx, err_msg, BuilderError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Handle to a node in an [`ArenaBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    kind: Kind,
    initargs: Initargs,
    relations: Vec<(Relation, Vec<(NodeId, Initargs)>)>,
    finished: bool,
}

impl Slot {
    fn entry(&self, name: &str) -> Option<&(Relation, Vec<(NodeId, Initargs)>)> {
        self.relations.iter().find(|(relation, _)| relation.name() == name)
    }

    fn count(&self, name: &str) -> usize {
        self.entry(name).map_or(0, |(_, rights)| rights.len())
    }
}

/// Rollback point of an open session.
#[derive(Debug, Clone)]
struct Mark {
    len: usize,
    saved: BTreeMap<usize, Slot>,
}

/// Builder backed by an arena of mutable nodes.
#[derive(Debug, Clone, Default)]
pub struct ArenaBuilder {
    slots: Vec<Slot>,
    schema: Option<Arc<Schema>>,
    sessions: Vec<Mark>,
}

impl ArenaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// An arena that validates every construction call against `schema`.
    pub fn with_schema(schema: impl Into<Arc<Schema>>) -> Self {
        Self {
            schema: Some(schema.into()),
            ..Self::default()
        }
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_deref()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_finished(&self, node: NodeId) -> bool {
        self.slots.get(node.0).is_some_and(|slot| slot.finished)
    }

    /// Nesting depth of currently open sessions.
    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }

    fn slot(&self, node: NodeId) -> Result<&Slot, BuilderError> {
        self.slots
            .get(node.0)
            .ok_or_else(|| err_msg!(UnknownNode, "node {} does not belong to this arena", node))
    }

    fn slot_mut(&mut self, node: NodeId) -> Result<&mut Slot, BuilderError> {
        self.slots
            .get_mut(node.0)
            .ok_or_else(|| err_msg!(UnknownNode, "node {} does not belong to this arena", node))
    }

    /// Saves the state of a node that predates the innermost session before
    /// its first mutation in that session.
    fn touch(&mut self, node: NodeId) {
        let Self { slots, sessions, .. } = self;
        if let (Some(mark), Some(slot)) = (sessions.last_mut(), slots.get(node.0)) {
            if node.0 < mark.len {
                mark.saved.entry(node.0).or_insert_with(|| slot.clone());
            }
        }
    }
}

impl Builder for ArenaBuilder {
    type Node = NodeId;

    fn make_node(&mut self, kind: &Kind, initargs: Initargs) -> Result<NodeId, BuilderError> {
        if let Some(schema) = &self.schema {
            schema.check_make(kind, &initargs)?;
        }
        let id = NodeId(self.slots.len());
        self.slots.push(Slot {
            kind: kind.clone(),
            initargs,
            relations: Vec::new(),
            finished: false,
        });
        Ok(id)
    }

    fn relate(
        &mut self,
        relation: &Relation,
        left: NodeId,
        right: NodeId,
        args: Initargs,
    ) -> Result<NodeId, BuilderError> {
        self.slot(right)?;
        if !self.slot(left)?.finished {
            self.touch(left);
        }
        let schema = self.schema.clone();
        let slot = self.slot_mut(left)?;
        if slot.finished {
            return Err(err_ctx!(
                InvalidState,
                format!("cannot relate '{}' from finished '{}' node {}", relation.name(), slot.kind, left),
                slot.initargs.bounds()
            ));
        }
        if let Some(schema) = schema {
            schema.check_relation(&slot.kind, relation)?;
        }
        let bounds = slot.initargs.bounds();
        match slot.relations.iter_mut().find(|(r, _)| r.name == relation.name) {
            Some((established, rights)) => {
                if established.cardinality != relation.cardinality {
                    return Err(err_ctx!(
                        Cardinality,
                        format!(
                            "relation '{}' was established as {} and cannot be reused as {}",
                            relation.name(),
                            established.cardinality,
                            relation.cardinality
                        ),
                        bounds
                    ));
                }
                relation
                    .cardinality
                    .admit(relation.name(), rights.iter().map(|(_, a)| a), &args)?;
                rights.push((right, args));
            }
            None => {
                relation
                    .cardinality
                    .admit(relation.name(), std::iter::empty::<&Initargs>(), &args)?;
                slot.relations.push((relation.clone(), vec![(right, args)]));
            }
        }
        Ok(left)
    }

    fn finish_node(&mut self, kind: &Kind, node: NodeId) -> Result<NodeId, BuilderError> {
        let schema = self.schema.clone();
        let slot = self.slot_mut(node)?;
        if &slot.kind != kind {
            return Err(err_ctx!(
                KindMismatch,
                format!("cannot finish '{}' node {} as '{}'", slot.kind, node, kind),
                slot.initargs.bounds()
            ));
        }
        if slot.finished {
            return Err(err_ctx!(
                InvalidState,
                format!("'{}' node {} is already finished", kind, node),
                slot.initargs.bounds()
            ));
        }
        if let Some(schema) = schema {
            schema.check_finish(&slot.kind, &slot.initargs, |name| slot.count(name))?;
        }
        self.touch(node);
        self.slot_mut(node)?.finished = true;
        Ok(node)
    }

    fn prepare(&mut self) -> Result<(), BuilderError> {
        self.sessions.push(Mark {
            len: self.slots.len(),
            saved: BTreeMap::new(),
        });
        debug!(mark = self.slots.len(), depth = self.sessions.len(), "arena session opened");
        Ok(())
    }

    fn finish_session(&mut self, outcome: SessionOutcome) -> Result<(), BuilderError> {
        let Some(mark) = self.sessions.pop() else {
            return Err(err_msg!(InvalidState, "no arena session is open"));
        };
        let unfinished = self.slots[mark.len..].iter().filter(|slot| !slot.finished).count();
        if outcome == SessionOutcome::Completed && unfinished == 0 {
            // The enclosing session still owes older nodes their pre-session state.
            if let Some(parent) = self.sessions.last_mut() {
                for (index, slot) in mark.saved {
                    if index < parent.len {
                        parent.saved.entry(index).or_insert(slot);
                    }
                }
            }
            return Ok(());
        }
        debug!(
            ?outcome,
            mark = mark.len,
            discarded = self.slots.len() - mark.len,
            restored = mark.saved.len(),
            "rolling back arena session"
        );
        self.slots.truncate(mark.len);
        for (index, slot) in mark.saved {
            self.slots[index] = slot;
        }
        if outcome == SessionOutcome::Completed {
            return Err(err_msg!(
                InvalidState,
                "session completed with {} unfinished node(s); its nodes were discarded",
                unfinished
            ));
        }
        Ok(())
    }
}

impl Introspect<NodeId> for ArenaBuilder {
    fn node_kind(&self, node: &NodeId) -> Result<Kind, BuilderError> {
        Ok(self.slot(*node)?.kind.clone())
    }

    fn node_initargs(&self, node: &NodeId) -> Result<Initargs, BuilderError> {
        Ok(self.slot(*node)?.initargs.clone())
    }

    fn node_relations(&self, node: &NodeId) -> Result<Vec<Relation>, BuilderError> {
        Ok(self
            .slot(*node)?
            .relations
            .iter()
            .map(|(relation, _)| relation.clone())
            .collect())
    }

    fn node_relation(&self, relation: &Relation, node: &NodeId) -> Result<Related<NodeId>, BuilderError> {
        let slot = self.slot(*node)?;
        let (_, rights) = slot.entry(relation.name()).ok_or_else(|| {
            err_msg!(UnknownRelation, "'{}' node {} has no relation '{}'", slot.kind, node, relation.name())
        })?;
        Ok(rights.iter().cloned().collect())
    }
}
