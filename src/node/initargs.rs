use super::{Span, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved keyword carrying a node's input range.
pub const BOUNDS: &str = "bounds";

/// Ordered `(keyword, value)` pairs.
///
/// Used both for the attributes a node is created with and for the
/// arguments of a relation. Order is preserved exactly as supplied so that
/// introspection can hand back what construction received.
///
/// # Examples
///
/// ```rust
/// use arbor::node::{Initargs, Span, Value};
/// let args = Initargs::new()
///     .with("value", 5)
///     .with_bounds(Span::new(0, 1));
/// assert_eq!(args.get("value"), Some(&Value::Number(5.0)));
/// assert_eq!(args.bounds(), Some(Span::new(0, 1)));
/// assert_eq!(args.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Initargs(Vec<(String, Value)>);

impl Initargs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pair, builder style.
    pub fn with(mut self, keyword: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(keyword, value);
        self
    }

    pub fn with_bounds(self, bounds: Span) -> Self {
        self.with(BOUNDS, Value::Bounds(bounds))
    }

    pub fn push(&mut self, keyword: impl Into<String>, value: impl Into<Value>) {
        self.0.push((keyword.into(), value.into()));
    }

    /// First value stored under `keyword`.
    pub fn get(&self, keyword: &str) -> Option<&Value> {
        self.0
            .iter()
            .find(|(k, _)| k == keyword)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.get(keyword).is_some()
    }

    /// The node's input range, if it carries a well-formed `bounds` initarg.
    pub fn bounds(&self) -> Option<Span> {
        self.get(BOUNDS).and_then(Value::as_bounds)
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (String, Value)> {
        self.0.iter()
    }

    /// Appends every pair of `other` after the pairs already present.
    pub fn extend_from(&mut self, other: &Initargs) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Initargs
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl IntoIterator for Initargs {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Initargs {
    type Item = &'a (String, Value);
    type IntoIter = std::slice::Iter<'a, (String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Initargs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", k, v)?;
        }
        write!(f, "}}")
    }
}
