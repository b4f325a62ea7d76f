//! Kind schema: the registry of kinds a validating builder recognizes.
//!
//! # Error Handling
//!
//! All errors are reported as [`BuilderError`] values built with `err_msg!` or
//! `err_ctx!`. Violations found while checking a node carry the node's
//! `bounds` when it has them.
//!
//! # File format
//!
//! Schemas load from YAML or JSON. Relation cardinalities use their textual
//! form (`optional`, `one`, `many`, `keyed(KEY)`).
//!
//! ```rust
//! use arbor::schema::Schema;
//! let schema = Schema::from_yaml_str(r#"
//! kinds:
//!   operator:
//!     required: [name]
//!     relations:
//!       operand: many
//!   literal:
//!     required: [value]
//! "#).unwrap();
//! assert!(schema.contains("operator"));
//! assert_eq!(schema.kinds().count(), 2);
//! ```
//!
//! # Summary Table
//! | Method            | Overwrites | Error on Duplicate |
//! |-------------------|------------|--------------------|
//! | register          | Yes        | No                 |
//! | register_or_error | No         | Yes                |
//! | unregister        | N/A        | N/A                |

use crate::node::{Cardinality, Initargs, Kind, Relation, Value, BOUNDS};
use crate::{err_ctx, err_msg, BuilderError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// What a kind accepts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KindSpec {
    /// Initargs every node of this kind must carry.
    #[serde(default)]
    pub required: Vec<String>,
    /// Initargs a node of this kind may carry.
    #[serde(default)]
    pub optional: Vec<String>,
    /// Accept initargs outside `required` and `optional`.
    #[serde(default)]
    pub open: bool,
    /// Relations this kind may be the left node of.
    #[serde(default)]
    pub relations: BTreeMap<String, Cardinality>,
}

impl KindSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, keyword: impl Into<String>) -> Self {
        self.required.push(keyword.into());
        self
    }

    pub fn allow(mut self, keyword: impl Into<String>) -> Self {
        self.optional.push(keyword.into());
        self
    }

    pub fn open(mut self) -> Self {
        self.open = true;
        self
    }

    pub fn relation(mut self, name: impl Into<String>, cardinality: Cardinality) -> Self {
        self.relations.insert(name.into(), cardinality);
        self
    }

    fn accepts(&self, keyword: &str) -> bool {
        self.open
            || keyword == BOUNDS
            || self.required.iter().any(|k| k == keyword)
            || self.optional.iter().any(|k| k == keyword)
    }
}

/// Registry of recognized kinds.
///
/// Not thread-safe to mutate; share behind an `Arc` once built.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    kinds: BTreeMap<Kind, KindSpec>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, BuilderError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn from_json_str(source: &str) -> Result<Self, BuilderError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Loads a schema file, choosing the format by extension (`.json`, or
    /// `.yaml`/`.yml`).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, BuilderError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&source),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&source),
            _ => Err(err_msg!(
                Config,
                "cannot tell the schema format of '{}'; use .json, .yaml or .yml",
                path.display()
            )),
        }
    }

    /// Registers `kind`, replacing any previous spec.
    pub fn register(&mut self, kind: impl Into<Kind>, spec: KindSpec) -> &mut Self {
        self.kinds.insert(kind.into(), spec);
        self
    }

    /// Registers `kind`, failing if it is already registered.
    pub fn register_or_error(&mut self, kind: impl Into<Kind>, spec: KindSpec) -> Result<(), BuilderError> {
        let kind = kind.into();
        if self.kinds.contains_key(&kind) {
            return Err(err_msg!(Config, "kind '{}' is already registered", kind));
        }
        self.kinds.insert(kind, spec);
        Ok(())
    }

    pub fn unregister(&mut self, kind: &str) -> Option<KindSpec> {
        self.kinds.remove(kind)
    }

    pub fn get(&self, kind: &str) -> Option<&KindSpec> {
        self.kinds.get(kind)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &Kind> {
        self.kinds.keys()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    fn spec(&self, kind: &Kind, initargs: &Initargs) -> Result<&KindSpec, BuilderError> {
        self.kinds.get(kind).ok_or_else(|| {
            let known = self.kinds.keys().map(Kind::as_str).collect::<Vec<_>>().join(", ");
            err_ctx!(
                UnknownKind,
                format!("'{}' is not a registered kind", kind),
                initargs.bounds(),
                format!("registered kinds: {}", known)
            )
        })
    }

    /// Checks that `kind` is registered and `initargs` fit it.
    pub fn check_make(&self, kind: &Kind, initargs: &Initargs) -> Result<(), BuilderError> {
        let spec = self.spec(kind, initargs)?;
        let bounds = initargs.bounds();
        if let Some(value) = initargs.get(BOUNDS) {
            match value {
                Value::Bounds(span) if span.start <= span.end => {}
                other => {
                    return Err(err_msg!(
                        InvalidInitargs,
                        "'{}' node has malformed bounds {}",
                        kind,
                        other
                    ))
                }
            }
        }
        if let Some(missing) = spec.required.iter().find(|k| !initargs.contains(k)) {
            return Err(err_ctx!(
                InvalidInitargs,
                format!("'{}' node is missing required initarg '{}'", kind, missing),
                bounds
            ));
        }
        if let Some(extra) = initargs.keywords().find(|k| !spec.accepts(k)) {
            return Err(err_ctx!(
                InvalidInitargs,
                format!("'{}' node does not accept initarg '{}'", kind, extra),
                bounds,
                format!("accepted: {}", spec.required.iter().chain(&spec.optional).cloned().collect::<Vec<_>>().join(", "))
            ));
        }
        Ok(())
    }

    /// Checks that a `kind` node may be the left node of `relation`, with the
    /// declared cardinality.
    pub fn check_relation(&self, kind: &Kind, relation: &Relation) -> Result<(), BuilderError> {
        let spec = self.spec(kind, &Initargs::new())?;
        match spec.relations.get(relation.name()) {
            None => Err(err_msg!(
                UnknownRelation,
                "'{}' nodes have no relation '{}'",
                kind,
                relation.name()
            )),
            Some(declared) if declared != &relation.cardinality => Err(err_msg!(
                Cardinality,
                "relation '{}' of '{}' is declared {} but was established as {}",
                relation.name(),
                kind,
                declared,
                relation.cardinality
            )),
            Some(_) => Ok(()),
        }
    }

    /// Checks, when a `kind` node is finished, that every `one` relation got
    /// its right node. `count` reports how many right nodes a relation has.
    pub fn check_finish<F>(&self, kind: &Kind, initargs: &Initargs, count: F) -> Result<(), BuilderError>
    where
        F: Fn(&str) -> usize,
    {
        let spec = self.spec(kind, initargs)?;
        for (name, cardinality) in &spec.relations {
            if !cardinality.allows_empty() && count(name) == 0 {
                return Err(err_ctx!(
                    Cardinality,
                    format!("'{}' node was finished without its '{}' relation", kind, name),
                    initargs.bounds()
                ));
            }
        }
        Ok(())
    }
}
