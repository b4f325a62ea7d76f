//! Construction session tests: prepare/wrap/finish_session ordering, exactly
//! once closing on every exit path, and arena rollback.

mod common;

use arbor::arena::ArenaBuilder;
use arbor::builder::{make_finish_node, with_builder, Builder, SessionOutcome};
use arbor::forwarding::Forwarding;
use arbor::introspect::Introspect;
use arbor::list::ListBuilder;
use arbor::node::{Initargs, Kind, Relation};
use arbor::{err_msg, BuilderError, ErrorType};
use common::{init_tracing, literal_args, operator_tree};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Records every session hook it sees, delegating construction to a list
/// builder.
#[derive(Default)]
struct Journal {
    list: ListBuilder,
    events: Vec<String>,
    fail_prepare: bool,
    fail_close: bool,
}

impl Builder for Journal {
    type Node = arbor::list::ListNode;

    fn make_node(&mut self, kind: &Kind, initargs: Initargs) -> Result<Self::Node, BuilderError> {
        self.events.push(format!("make {}", kind));
        self.list.make_node(kind, initargs)
    }

    fn relate(
        &mut self,
        relation: &Relation,
        left: Self::Node,
        right: Self::Node,
        args: Initargs,
    ) -> Result<Self::Node, BuilderError> {
        self.list.relate(relation, left, right, args)
    }

    fn finish_node(&mut self, kind: &Kind, node: Self::Node) -> Result<Self::Node, BuilderError> {
        self.list.finish_node(kind, node)
    }

    fn prepare(&mut self) -> Result<(), BuilderError> {
        self.events.push("prepare".into());
        if self.fail_prepare {
            return Err(err_msg!(InvalidState, "cannot open a session"));
        }
        Ok(())
    }

    fn wrap<R, F>(&mut self, body: F) -> Result<R, BuilderError>
    where
        F: FnOnce(&mut Self) -> Result<R, BuilderError>,
    {
        self.events.push("wrap begin".into());
        let result = body(self);
        self.events.push("wrap end".into());
        result
    }

    fn finish_session(&mut self, outcome: SessionOutcome) -> Result<(), BuilderError> {
        self.events.push(format!("finish {:?}", outcome));
        if self.fail_close {
            return Err(err_msg!(Internal, "cannot close the session"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod ordering_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn hooks_run_in_order_around_the_body() {
        init_tracing();
        let mut journal = Journal::default();
        let leaf = with_builder(&mut journal, |b| make_finish_node(b, "literal", literal_args(5))).unwrap();
        assert_eq!(leaf.kind(), "literal");
        assert_eq!(
            journal.events,
            vec!["prepare", "wrap begin", "make literal", "wrap end", "finish Completed"]
        );
    }

    #[test]
    fn failed_prepare_skips_body_and_close() {
        let mut journal = Journal {
            fail_prepare: true,
            ..Journal::default()
        };
        let err = with_builder(&mut journal, |b| make_finish_node(b, "literal", literal_args(5))).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::InvalidState);
        assert_eq!(journal.events, vec!["prepare"]);
    }

    #[test]
    fn body_error_closes_as_aborted() {
        let mut journal = Journal::default();
        let err = with_builder(&mut journal, |b| -> Result<(), BuilderError> {
            b.make_node(&Kind::from("literal"), literal_args(1))?;
            Err(err_msg!(Visit, "producer gave up"))
        })
        .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Visit);
        assert_eq!(journal.events.last().map(String::as_str), Some("finish Aborted"));
    }
}

#[cfg(test)]
mod exactly_once_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn finish_session_runs_once_on_success() {
        let mut builder = Forwarding::new(ListBuilder::new());
        with_builder(&mut builder, |b| operator_tree(b, "+", 5, 6)).unwrap();
        let calls = builder.calls();
        assert_eq!((calls.prepare, calls.finish_session), (1, 1));
        assert_eq!(calls.make_node, 3);
        assert_eq!(calls.relate, 2);
        assert_eq!(calls.finish_node, 3);
    }

    #[test]
    fn finish_session_runs_once_on_error() {
        let mut builder = Forwarding::new(ListBuilder::new());
        let result = with_builder(&mut builder, |b| {
            make_finish_node(b, "literal", literal_args(1))?;
            Err::<(), _>(err_msg!(InvalidState, "stop"))
        });
        assert!(result.is_err());
        assert_eq!(builder.calls().finish_session, 1);
    }

    #[test]
    fn finish_session_runs_once_on_panic() {
        init_tracing();
        let mut builder = Forwarding::new(ArenaBuilder::new());
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            with_builder(&mut builder, |b| -> Result<(), BuilderError> {
                b.make_node(&Kind::from("literal"), literal_args(1))?;
                panic!("producer blew up");
            })
        }));
        assert!(outcome.is_err());
        assert_eq!(builder.calls().finish_session, 1);
        // The arena saw an aborted session and rolled back.
        assert!(builder.inner().is_empty());
        assert_eq!(builder.inner().open_sessions(), 0);
    }

    #[test]
    fn forwarding_reaches_inner_session_hooks_but_not_wrap() {
        let mut builder = Forwarding::new(Journal::default());
        with_builder(&mut builder, |b| make_finish_node(b, "literal", literal_args(5))).unwrap();
        assert_eq!(
            builder.inner().events,
            vec!["prepare", "make literal", "finish Completed"]
        );
        let calls = builder.calls();
        assert_eq!((calls.prepare, calls.finish_session), (1, 1));
    }

    #[test]
    fn close_error_surfaces_when_body_succeeds() {
        let mut journal = Journal {
            fail_close: true,
            ..Journal::default()
        };
        let err = with_builder(&mut journal, |b| make_finish_node(b, "literal", literal_args(5))).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Internal);
    }

    #[test]
    fn body_error_wins_over_close_error() {
        let mut journal = Journal {
            fail_close: true,
            ..Journal::default()
        };
        let err = with_builder(&mut journal, |_| Err::<(), _>(err_msg!(Visit, "body failed"))).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Visit);
        assert_eq!(err.message(), "body failed");
    }
}

#[cfg(test)]
mod arena_session_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn completed_session_keeps_its_nodes() {
        let mut arena = ArenaBuilder::new();
        let root = with_builder(&mut arena, |b| operator_tree(b, "+", 5, 6)).unwrap();
        assert_eq!(arena.len(), 3);
        assert!(arena.is_finished(root));
        assert_eq!(arena.open_sessions(), 0);
    }

    #[test]
    fn aborted_session_rolls_back() {
        let mut arena = ArenaBuilder::new();
        make_finish_node(&mut arena, "literal", literal_args(0)).unwrap();
        let result = with_builder(&mut arena, |b| {
            operator_tree(b, "+", 5, 6)?;
            Err::<(), _>(err_msg!(InvalidState, "changed my mind"))
        });
        assert!(result.is_err());
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn unfinished_nodes_roll_back_a_completed_session() {
        let mut arena = ArenaBuilder::new();
        let err = with_builder(&mut arena, |b| {
            b.make_node(&Kind::from("literal"), literal_args(1))?;
            make_finish_node(b, "literal", literal_args(2))
        })
        .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::InvalidState);
        assert!(arena.is_empty());
    }

    #[test]
    fn nested_sessions_roll_back_independently() {
        let mut arena = ArenaBuilder::new();
        let kept = with_builder(&mut arena, |b| {
            let kept = make_finish_node(b, "literal", literal_args(1))?;
            let inner = with_builder(b, |b| {
                make_finish_node(b, "literal", literal_args(2))?;
                Err::<(), _>(err_msg!(InvalidState, "inner abort"))
            });
            assert!(inner.is_err());
            assert_eq!(b.open_sessions(), 1);
            Ok(kept)
        })
        .unwrap();
        assert_eq!(arena.len(), 1);
        assert!(arena.is_finished(kept));
    }

    #[test]
    fn aborted_session_restores_relations_of_older_nodes() {
        let mut arena = ArenaBuilder::new();
        let operand = Relation::many("operand");
        let parent = arena.make_node(&Kind::from("operator"), Initargs::new().with("name", "+")).unwrap();
        let result = with_builder(&mut arena, |b| {
            let child = make_finish_node(b, "literal", literal_args(5))?;
            b.relate(&operand, parent, child, Initargs::new())?;
            Err::<(), _>(err_msg!(InvalidState, "changed my mind"))
        });
        assert!(result.is_err());
        assert_eq!(arena.len(), 1);
        assert!(arena.node_relations(&parent).unwrap().is_empty());
        assert_eq!(
            arena.node_relation(&operand, &parent).unwrap_err().error_type(),
            ErrorType::UnknownRelation
        );

        // The reused slot must not show up under the parent.
        let fresh = make_finish_node(&mut arena, "literal", literal_args(6)).unwrap();
        assert_eq!(fresh.index(), 1);
        arena.relate(&operand, parent, fresh, Initargs::new()).unwrap();
        let related = arena.node_relation(&operand, &parent).unwrap();
        assert_eq!(related.nodes().to_vec(), vec![fresh]);
    }

    #[test]
    fn aborted_session_restores_finished_flags() {
        let mut arena = ArenaBuilder::new();
        let literal = Kind::from("literal");
        let node = arena.make_node(&literal, literal_args(1)).unwrap();
        let result = with_builder(&mut arena, |b| {
            b.finish_node(&literal, node)?;
            Err::<(), _>(err_msg!(InvalidState, "changed my mind"))
        });
        assert!(result.is_err());
        assert!(!arena.is_finished(node));
        arena.finish_node(&literal, node).unwrap();
        assert!(arena.is_finished(node));
    }

    #[test]
    fn outer_abort_undoes_what_a_completed_inner_session_did() {
        let mut arena = ArenaBuilder::new();
        let operand = Relation::many("operand");
        let parent = arena.make_node(&Kind::from("operator"), Initargs::new().with("name", "+")).unwrap();
        let result = with_builder(&mut arena, |b| {
            with_builder(b, |b| {
                let child = make_finish_node(b, "literal", literal_args(2))?;
                b.relate(&operand, parent, child, Initargs::new())
            })?;
            Err::<(), _>(err_msg!(InvalidState, "outer abort"))
        });
        assert!(result.is_err());
        assert_eq!(arena.len(), 1);
        assert!(arena.node_relations(&parent).unwrap().is_empty());
        assert_eq!(arena.open_sessions(), 0);
    }

    #[test]
    fn closing_without_a_session_is_an_error() {
        let mut arena = ArenaBuilder::new();
        let err = arena.finish_session(SessionOutcome::Completed).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::InvalidState);
    }
}
