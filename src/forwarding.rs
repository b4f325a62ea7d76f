//! Delegating builder wrapper.
//!
//! [`Forwarding`] passes construction, introspection, `prepare` and
//! `finish_session` calls through to the builder it wraps, emitting a
//! `trace!` event and counting the call on the way.
//!
//! The inner builder's `wrap` is not layered. The default `wrap` runs the
//! session body against the wrapper; the inner one would hand it `&mut B`.

use crate::builder::{Builder, SessionOutcome};
use crate::introspect::{Introspect, Related};
use crate::node::{Initargs, Kind, Relation};
use crate::BuilderError;
use std::cell::Cell;
use tracing::trace;

/// Number of protocol calls a [`Forwarding`] builder has passed through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Calls {
    pub make_node: usize,
    pub relate: usize,
    pub finish_node: usize,
    pub prepare: usize,
    pub finish_session: usize,
    pub node_kind: usize,
    pub node_initargs: usize,
    pub node_relations: usize,
    pub node_relation: usize,
}

impl Calls {
    /// Total number of introspection calls.
    pub fn introspection(&self) -> usize {
        self.node_kind + self.node_initargs + self.node_relations + self.node_relation
    }
}

#[derive(Debug, Default)]
struct Counters {
    make_node: Cell<usize>,
    relate: Cell<usize>,
    finish_node: Cell<usize>,
    prepare: Cell<usize>,
    finish_session: Cell<usize>,
    node_kind: Cell<usize>,
    node_initargs: Cell<usize>,
    node_relations: Cell<usize>,
    node_relation: Cell<usize>,
}

fn bump(counter: &Cell<usize>) {
    counter.set(counter.get() + 1);
}

/// Wraps a builder, forwarding every call to it.
#[derive(Debug, Default)]
pub struct Forwarding<B> {
    inner: B,
    counters: Counters,
}

impl<B> Forwarding<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            counters: Counters::default(),
        }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    pub fn into_inner(self) -> B {
        self.inner
    }

    /// Snapshot of the calls forwarded so far.
    pub fn calls(&self) -> Calls {
        let c = &self.counters;
        Calls {
            make_node: c.make_node.get(),
            relate: c.relate.get(),
            finish_node: c.finish_node.get(),
            prepare: c.prepare.get(),
            finish_session: c.finish_session.get(),
            node_kind: c.node_kind.get(),
            node_initargs: c.node_initargs.get(),
            node_relations: c.node_relations.get(),
            node_relation: c.node_relation.get(),
        }
    }

    pub fn reset_calls(&self) {
        let c = &self.counters;
        for counter in [
            &c.make_node,
            &c.relate,
            &c.finish_node,
            &c.prepare,
            &c.finish_session,
            &c.node_kind,
            &c.node_initargs,
            &c.node_relations,
            &c.node_relation,
        ] {
            counter.set(0);
        }
    }
}

impl<B: Builder> Builder for Forwarding<B> {
    type Node = B::Node;

    fn make_node(&mut self, kind: &Kind, initargs: Initargs) -> Result<B::Node, BuilderError> {
        bump(&self.counters.make_node);
        trace!(%kind, %initargs, "make_node");
        self.inner.make_node(kind, initargs)
    }

    fn relate(
        &mut self,
        relation: &Relation,
        left: B::Node,
        right: B::Node,
        args: Initargs,
    ) -> Result<B::Node, BuilderError> {
        bump(&self.counters.relate);
        trace!(%relation, %args, "relate");
        self.inner.relate(relation, left, right, args)
    }

    fn finish_node(&mut self, kind: &Kind, node: B::Node) -> Result<B::Node, BuilderError> {
        bump(&self.counters.finish_node);
        trace!(%kind, "finish_node");
        self.inner.finish_node(kind, node)
    }

    fn prepare(&mut self) -> Result<(), BuilderError> {
        bump(&self.counters.prepare);
        trace!("prepare");
        self.inner.prepare()
    }

    fn finish_session(&mut self, outcome: SessionOutcome) -> Result<(), BuilderError> {
        bump(&self.counters.finish_session);
        trace!(?outcome, "finish_session");
        self.inner.finish_session(outcome)
    }
}

impl<N, B: Introspect<N>> Introspect<N> for Forwarding<B> {
    fn node_kind(&self, node: &N) -> Result<Kind, BuilderError> {
        bump(&self.counters.node_kind);
        self.inner.node_kind(node)
    }

    fn node_initargs(&self, node: &N) -> Result<Initargs, BuilderError> {
        bump(&self.counters.node_initargs);
        self.inner.node_initargs(node)
    }

    fn node_relations(&self, node: &N) -> Result<Vec<Relation>, BuilderError> {
        bump(&self.counters.node_relations);
        self.inner.node_relations(node)
    }

    fn node_relation(&self, relation: &Relation, node: &N) -> Result<Related<N>, BuilderError> {
        bump(&self.counters.node_relation);
        trace!(%relation, "node_relation");
        self.inner.node_relation(relation, node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::make_finish_node;
    use crate::list::ListBuilder;

    #[test]
    fn counts_and_resets_forwarded_calls() {
        let mut builder = Forwarding::new(ListBuilder::new());
        let node = make_finish_node(&mut builder, "literal", Initargs::new().with("value", 1)).unwrap();
        assert_eq!(builder.node_kind(&node).unwrap(), "literal");
        let calls = builder.calls();
        assert_eq!((calls.make_node, calls.finish_node), (1, 1));
        assert_eq!(calls.introspection(), 1);

        builder.reset_calls();
        assert_eq!(builder.calls(), Calls::default());
        assert_eq!(builder.into_inner().node_kind(&node).unwrap(), "literal");
    }
}
