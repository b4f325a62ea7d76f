//! # Shared test fixtures
//!
//! A typed expression AST that implements both protocols, plus helpers for
//! building the canonical `operator(literal 5, literal 6)` tree with any
//! builder.
#![allow(dead_code)]

use arbor::builder::{make_finish_node, make_finish_node_relations, Builder, RelationSpec, RightSpec};
use arbor::introspect::{Introspect, Related};
use arbor::node::{Initargs, Kind, Relation, Span, BOUNDS};
use arbor::{err_msg, BuilderError};

/// Installs a test-writer subscriber so `tracing` output shows up on failure.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

pub fn literal_args(value: i32) -> Initargs {
    Initargs::new().with("value", value)
}

/// Builds `operator(operand=literal(value=a), operand=literal(value=b))`.
pub fn operator_tree<B>(builder: &mut B, name: &str, a: i32, b: i32) -> Result<B::Node, BuilderError>
where
    B: Builder,
{
    let operand = |value: i32| RightSpec::build(move |b: &mut B| make_finish_node(b, "literal", literal_args(value)));
    make_finish_node_relations(
        builder,
        "operator",
        Initargs::new().with("name", name),
        vec![RelationSpec::many("operand", [operand(a), operand(b)])],
    )
}

// ============================================================================
// TYPED AST
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal {
        value: f64,
        bounds: Option<Span>,
    },
    Operator {
        name: String,
        operands: Vec<Expr>,
        bounds: Option<Span>,
    },
}

impl Expr {
    pub fn evaluate(&self) -> f64 {
        match self {
            Expr::Literal { value, .. } => *value,
            Expr::Operator { name, operands, .. } => {
                let values = operands.iter().map(Expr::evaluate);
                match name.as_str() {
                    "*" => values.product(),
                    _ => values.sum(),
                }
            }
        }
    }
}

/// Builds [`Expr`] values. Knows exactly two kinds, `literal` and `operator`.
#[derive(Debug, Default)]
pub struct ExprBuilder;

impl Builder for ExprBuilder {
    type Node = Expr;

    fn make_node(&mut self, kind: &Kind, initargs: Initargs) -> Result<Expr, BuilderError> {
        let bounds = initargs.bounds();
        match kind.as_str() {
            "literal" => {
                let value = initargs
                    .get("value")
                    .and_then(|v| v.as_number())
                    .ok_or_else(|| err_msg!(InvalidInitargs, "literal needs a numeric value"))?;
                Ok(Expr::Literal { value, bounds })
            }
            "operator" => {
                let name = initargs
                    .get("name")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| err_msg!(InvalidInitargs, "operator needs a name"))?;
                Ok(Expr::Operator {
                    name: name.to_string(),
                    operands: Vec::new(),
                    bounds,
                })
            }
            other => Err(err_msg!(UnknownKind, "expression kind '{}'", other)),
        }
    }

    fn relate(
        &mut self,
        relation: &Relation,
        left: Expr,
        right: Expr,
        _args: Initargs,
    ) -> Result<Expr, BuilderError> {
        match (relation.name(), left) {
            ("operand", Expr::Operator { name, mut operands, bounds }) => {
                operands.push(right);
                Ok(Expr::Operator { name, operands, bounds })
            }
            (other, _) => Err(err_msg!(UnknownRelation, "expressions have no relation '{}'", other)),
        }
    }

    fn finish_node(&mut self, kind: &Kind, node: Expr) -> Result<Expr, BuilderError> {
        let actual = self.node_kind(&node)?;
        if &actual != kind {
            return Err(err_msg!(KindMismatch, "'{}' finished as '{}'", actual, kind));
        }
        Ok(node)
    }
}

impl Introspect<Expr> for ExprBuilder {
    fn node_kind(&self, node: &Expr) -> Result<Kind, BuilderError> {
        Ok(match node {
            Expr::Literal { .. } => Kind::from("literal"),
            Expr::Operator { .. } => Kind::from("operator"),
        })
    }

    fn node_initargs(&self, node: &Expr) -> Result<Initargs, BuilderError> {
        let (mut initargs, bounds) = match node {
            Expr::Literal { value, bounds } => (Initargs::new().with("value", *value), bounds),
            Expr::Operator { name, bounds, .. } => (Initargs::new().with("name", name.as_str()), bounds),
        };
        if let Some(bounds) = bounds {
            initargs.push(BOUNDS, *bounds);
        }
        Ok(initargs)
    }

    fn node_relations(&self, node: &Expr) -> Result<Vec<Relation>, BuilderError> {
        Ok(match node {
            Expr::Operator { operands, .. } if !operands.is_empty() => vec![Relation::many("operand")],
            _ => Vec::new(),
        })
    }

    fn node_relation(&self, relation: &Relation, node: &Expr) -> Result<Related<Expr>, BuilderError> {
        match (relation.name(), node) {
            ("operand", Expr::Operator { operands, .. }) => Ok(operands
                .iter()
                .cloned()
                .map(|operand| (operand, Initargs::new()))
                .collect()),
            (other, _) => Err(err_msg!(UnknownRelation, "no relation '{}'", other)),
        }
    }
}
