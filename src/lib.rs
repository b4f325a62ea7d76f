//! # Arbor
//!
//! Representation-agnostic plumbing between tree producers and tree
//! consumers. Producers construct through [`builder::Builder`]; consumers walk
//! finished trees through [`introspect::Introspect`] with [`walk::walk`].

pub use crate::diagnostics::{BuilderError, ErrorContext, ErrorType};

pub mod arena;
pub mod builder;
pub mod diagnostics;
pub mod forwarding;
pub mod introspect;
pub mod list;
pub mod node;
pub mod schema;
pub mod walk;
