//! # List Builder
//!
//! Reference builder that materializes nodes as persistent nested sequences:
//! a kind, its initargs, and an ordered list of relation entries, each
//! holding `(right node, relation args)` pairs.
//!
//! ## Invariants
//! - Never mutates a node: `relate` returns a new `ListNode` and leaves the
//!   value it was given untouched. Structural sharing (`im::Vector`) keeps
//!   this cheap.
//! - A relation name keeps the cardinality it was first established with.

use crate::builder::Builder;
use crate::introspect::{Introspect, Related};
use crate::node::{Initargs, Kind, Relation};
use crate::{err_ctx, err_msg, BuilderError};
use im::Vector;

/// One relation of a [`ListNode`] and everything attached under it.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationEntry {
    pub relation: Relation,
    pub rights: Vector<(ListNode, Initargs)>,
}

impl RelationEntry {
    pub fn len(&self) -> usize {
        self.rights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rights.is_empty()
    }
}

/// A node in nested-sequence form.
#[derive(Debug, Clone, PartialEq)]
pub struct ListNode {
    kind: Kind,
    initargs: Initargs,
    relations: Vector<RelationEntry>,
}

impl ListNode {
    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn initargs(&self) -> &Initargs {
        &self.initargs
    }

    pub fn relations(&self) -> impl Iterator<Item = &RelationEntry> {
        self.relations.iter()
    }

    /// The entry for relation `name`, if anything was attached under it.
    pub fn relation(&self, name: &str) -> Option<&RelationEntry> {
        self.relations.iter().find(|entry| entry.relation.name() == name)
    }
}

/// Builds [`ListNode`]s. Stateless; accepts any kind and any initargs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListBuilder;

impl ListBuilder {
    pub fn new() -> Self {
        Self
    }
}

impl Builder for ListBuilder {
    type Node = ListNode;

    fn make_node(&mut self, kind: &Kind, initargs: Initargs) -> Result<ListNode, BuilderError> {
        Ok(ListNode {
            kind: kind.clone(),
            initargs,
            relations: Vector::new(),
        })
    }

    fn relate(
        &mut self,
        relation: &Relation,
        left: ListNode,
        right: ListNode,
        args: Initargs,
    ) -> Result<ListNode, BuilderError> {
        let mut node = left;
        let position = node
            .relations
            .iter()
            .position(|entry| entry.relation.name == relation.name);
        match position {
            Some(index) => {
                let mut entry = node.relations[index].clone();
                if entry.relation.cardinality != relation.cardinality {
                    return Err(err_ctx!(
                        Cardinality,
                        format!(
                            "relation '{}' was established as {} and cannot be reused as {}",
                            relation.name(),
                            entry.relation.cardinality,
                            relation.cardinality
                        ),
                        node.initargs.bounds()
                    ));
                }
                relation
                    .cardinality
                    .admit(relation.name(), entry.rights.iter().map(|(_, a)| a), &args)?;
                entry.rights.push_back((right, args));
                node.relations.set(index, entry);
            }
            None => {
                relation
                    .cardinality
                    .admit(relation.name(), std::iter::empty::<&Initargs>(), &args)?;
                node.relations.push_back(RelationEntry {
                    relation: relation.clone(),
                    rights: Vector::unit((right, args)),
                });
            }
        }
        Ok(node)
    }

    fn finish_node(&mut self, kind: &Kind, node: ListNode) -> Result<ListNode, BuilderError> {
        if &node.kind != kind {
            return Err(err_ctx!(
                KindMismatch,
                format!("cannot finish a '{}' node as '{}'", node.kind, kind),
                node.initargs.bounds()
            ));
        }
        Ok(node)
    }
}

impl Introspect<ListNode> for ListBuilder {
    fn node_kind(&self, node: &ListNode) -> Result<Kind, BuilderError> {
        Ok(node.kind.clone())
    }

    fn node_initargs(&self, node: &ListNode) -> Result<Initargs, BuilderError> {
        Ok(node.initargs.clone())
    }

    fn node_relations(&self, node: &ListNode) -> Result<Vec<Relation>, BuilderError> {
        Ok(node.relations.iter().map(|e| e.relation.clone()).collect())
    }

    fn node_relation(
        &self,
        relation: &Relation,
        node: &ListNode,
    ) -> Result<Related<ListNode>, BuilderError> {
        let entry = node
            .relation(relation.name())
            .ok_or_else(|| err_msg!(UnknownRelation, "'{}' node has no relation '{}'", node.kind, relation.name()))?;
        Ok(entry.rights.iter().cloned().collect())
    }
}
