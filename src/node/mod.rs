//! Node model for the Arbor protocols.
//!
//! Nodes themselves are opaque: each builder picks its own representation.
//! This module only defines the data that crosses the protocol boundary:
//! kinds, initargs and their values, input spans, and cardinality-tagged
//! relations.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

pub mod initargs;
pub mod relation;
pub mod value;

pub use initargs::{Initargs, BOUNDS};
pub use relation::{Cardinality, Relation};
pub use value::Value;

// ============================================================================
// SPAN
// ============================================================================

/// A half-open `[start, end)` range in the input a node was produced from.
///
/// Conventionally carried by the reserved `bounds` initarg.
///
/// # Examples
///
/// ```rust
/// use arbor::node::Span;
/// let span = Span::new(0, 5);
/// assert_eq!(span.len(), 5);
/// assert!(!span.is_empty());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

// ============================================================================
// KIND
// ============================================================================

/// Names what sort of node something is, e.g. `literal` or `operator`.
///
/// Cheap to clone; stable for a node from `make` through introspection.
///
/// # Examples
///
/// ```rust
/// use arbor::node::Kind;
/// let kind = Kind::from("literal");
/// assert_eq!(kind.as_str(), "literal");
/// assert_eq!(kind, "literal");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kind(Arc<str>);

impl Kind {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Kind {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Kind {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&Kind> for Kind {
    fn from(kind: &Kind) -> Self {
        kind.clone()
    }
}

impl Borrow<str> for Kind {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Kind {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Kind {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
