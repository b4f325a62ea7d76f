//! Relations and their cardinalities.
//!
//! A relation is a named, directed edge from a left node to right nodes. The
//! cardinality says how many right nodes the edge may carry and, for keyed
//! relations, which relation argument must be unique.

use super::{Initargs, Value};
use crate::{err_ctx, err_msg, BuilderError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// How many right nodes a relation admits.
///
/// Textual forms, used by schema files: `optional` (or `?`), `one` (or `1`),
/// `many` (or `*`), `keyed(KEY)`.
///
/// # Examples
///
/// ```rust
/// use arbor::node::Cardinality;
/// assert_eq!("*".parse::<Cardinality>().unwrap(), Cardinality::Many);
/// assert_eq!(
///     "keyed(name)".parse::<Cardinality>().unwrap(),
///     Cardinality::Keyed("name".to_string())
/// );
/// assert!(Cardinality::Many.is_sequence());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Cardinality {
    Optional,
    One,
    #[default]
    Many,
    /// A sequence whose relation args carry a unique value under this keyword.
    Keyed(String),
}

impl Cardinality {
    /// `many` and `keyed` relations traverse to a sequence of results.
    pub fn is_sequence(&self) -> bool {
        matches!(self, Cardinality::Many | Cardinality::Keyed(_))
    }

    /// Whether a relation may end up with no right node at all.
    pub fn allows_empty(&self) -> bool {
        !matches!(self, Cardinality::One)
    }

    /// Checks that one more right node may be attached.
    ///
    /// `existing` holds the relation args of the right nodes already attached
    /// under this relation on the same left node; `args` are the args of the
    /// new one. `relation` is only used for messages.
    pub fn admit<'a, I>(&self, relation: &str, existing: I, args: &Initargs) -> Result<(), BuilderError>
    where
        I: IntoIterator<Item = &'a Initargs>,
    {
        match self {
            Cardinality::Many => Ok(()),
            Cardinality::One | Cardinality::Optional => {
                if existing.into_iter().next().is_some() {
                    return Err(err_ctx!(
                        Cardinality,
                        format!("relation '{}' is {} but already has a right node", relation, self),
                        args.bounds(),
                        "use cardinality 'many' for relations that accumulate"
                    ));
                }
                Ok(())
            }
            Cardinality::Keyed(key) => {
                let Some(value) = args.get(key) else {
                    return Err(err_msg!(
                        InvalidInitargs,
                        "relation '{}' is {} but the relation args lack '{}'",
                        relation,
                        self,
                        key
                    ));
                };
                let duplicate = existing
                    .into_iter()
                    .any(|other| other.get(key) == Some(value));
                if duplicate {
                    return Err(duplicate_key(relation, key, value));
                }
                Ok(())
            }
        }
    }
}

fn duplicate_key(relation: &str, key: &str, value: &Value) -> BuilderError {
    err_msg!(
        DuplicateKey,
        "relation '{}' already has a right node with {} = {}",
        relation,
        key,
        value
    )
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::Optional => write!(f, "optional"),
            Cardinality::One => write!(f, "one"),
            Cardinality::Many => write!(f, "many"),
            Cardinality::Keyed(key) => write!(f, "keyed({})", key),
        }
    }
}

impl FromStr for Cardinality {
    type Err = BuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "optional" | "?" => Ok(Cardinality::Optional),
            "one" | "1" => Ok(Cardinality::One),
            "many" | "*" => Ok(Cardinality::Many),
            other => other
                .strip_prefix("keyed(")
                .and_then(|rest| rest.strip_suffix(')'))
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(|key| Cardinality::Keyed(key.to_string()))
                .ok_or_else(|| err_msg!(Config, "unrecognized cardinality '{}'", other)),
        }
    }
}

impl TryFrom<String> for Cardinality {
    type Error = BuilderError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Cardinality> for String {
    fn from(cardinality: Cardinality) -> Self {
        cardinality.to_string()
    }
}

/// A relation name tagged with its cardinality.
///
/// # Examples
///
/// ```rust
/// use arbor::node::{Cardinality, Relation};
/// let operand = Relation::many("operand");
/// assert_eq!(operand.name(), "operand");
/// assert_eq!(operand.cardinality, Cardinality::Many);
/// assert_eq!(Relation::keyed("field", "name").to_string(), "field (keyed(name))");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub name: Arc<str>,
    #[serde(default)]
    pub cardinality: Cardinality,
}

impl Relation {
    pub fn new(name: impl AsRef<str>, cardinality: Cardinality) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            cardinality,
        }
    }

    pub fn optional(name: impl AsRef<str>) -> Self {
        Self::new(name, Cardinality::Optional)
    }

    pub fn one(name: impl AsRef<str>) -> Self {
        Self::new(name, Cardinality::One)
    }

    pub fn many(name: impl AsRef<str>) -> Self {
        Self::new(name, Cardinality::Many)
    }

    pub fn keyed(name: impl AsRef<str>, key: impl Into<String>) -> Self {
        Self::new(name, Cardinality::Keyed(key.into()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.cardinality)
    }
}
