//! # Arbor Diagnostics
//!
//! Unified, `miette`-based error type for every stage of the construction and
//! traversal protocols. Builders, the schema layer, the orchestration helpers
//! and the walker all report failures as [`BuilderError`].
//!
//! # Error Construction Macros
//!
//! - **Use `err_msg!` for message-only errors.**
//!   - `err_msg!(UnknownKind, "unknown kind '{}'", kind)`
//!
//! - **Use `err_ctx!` when the failing node carries `bounds`.**
//!   - `err_ctx!(Cardinality, message, initargs.bounds())`
//!   - `err_ctx!(Cardinality, message, initargs.bounds(), help)`
//!
//! Attach the parsed input afterwards with [`BuilderError::with_source`] so
//! the diagnostic renders a labelled snippet of the offending range.

use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use thiserror::Error;

use crate::node::Span;

pub type SourceArc = Arc<NamedSource<String>>;

/// Type-safe classification of [`BuilderError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// The builder does not recognize the requested kind.
    UnknownKind,
    /// Initargs or relation args do not have the shape the kind requires.
    InvalidInitargs,
    /// A relation was established more often than its cardinality permits.
    Cardinality,
    /// A keyed relation received a key value that is already present.
    DuplicateKey,
    /// `finish_node` was called with a kind other than the node's own.
    KindMismatch,
    /// A relation name the node or its kind does not know.
    UnknownRelation,
    /// A node handle the builder did not create.
    UnknownNode,
    /// An operation arrived at the wrong point of a node or session lifecycle.
    InvalidState,
    /// Raised by user visit or peek functions during a walk.
    Visit,
    /// Schema configuration could not be loaded.
    Config,
    /// Broken internal invariant.
    Internal,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::UnknownKind => "UnknownKind",
            ErrorType::InvalidInitargs => "InvalidInitargs",
            ErrorType::Cardinality => "Cardinality",
            ErrorType::DuplicateKey => "DuplicateKey",
            ErrorType::KindMismatch => "KindMismatch",
            ErrorType::UnknownRelation => "UnknownRelation",
            ErrorType::UnknownNode => "UnknownNode",
            ErrorType::InvalidState => "InvalidState",
            ErrorType::Visit => "Visit",
            ErrorType::Config => "Config",
            ErrorType::Internal => "Internal",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Optional location and help attached to an error.
#[derive(Debug, Default)]
pub struct ErrorContext {
    /// The input the failing node was produced from (if the caller attached it).
    pub source: Option<SourceArc>,
    /// The failing node's `bounds`, if it had any.
    pub span: Option<Span>,
    /// An optional help message.
    pub help: Option<String>,
}

impl ErrorContext {
    /// Returns an empty error context.
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates a context with only a span.
    pub fn with_span(span: Option<Span>) -> Self {
        Self {
            span,
            ..Self::default()
        }
    }

    /// Creates a context with a span and a help message.
    pub fn with_help(span: Option<Span>, help: String) -> Self {
        Self {
            source: None,
            span,
            help: Some(help),
        }
    }
}

/// Unified error type for all builder, schema and traversal failures.
#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("Unknown kind: {message}")]
    UnknownKind {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Invalid initargs: {message}")]
    InvalidInitargs {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Cardinality violation: {message}")]
    Cardinality {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Duplicate key: {message}")]
    DuplicateKey {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Kind mismatch: {message}")]
    KindMismatch {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Unknown relation: {message}")]
    UnknownRelation {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Unknown node: {message}")]
    UnknownNode {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Invalid state: {message}")]
    InvalidState {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Visit failed: {message}")]
    Visit {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
}

impl BuilderError {
    fn parts(&self) -> (&str, &ErrorContext) {
        match self {
            BuilderError::UnknownKind { message, ctx, .. }
            | BuilderError::InvalidInitargs { message, ctx, .. }
            | BuilderError::Cardinality { message, ctx, .. }
            | BuilderError::DuplicateKey { message, ctx, .. }
            | BuilderError::KindMismatch { message, ctx, .. }
            | BuilderError::UnknownRelation { message, ctx, .. }
            | BuilderError::UnknownNode { message, ctx, .. }
            | BuilderError::InvalidState { message, ctx, .. }
            | BuilderError::Visit { message, ctx, .. }
            | BuilderError::Config { message, ctx, .. }
            | BuilderError::Internal { message, ctx, .. } => (message, ctx),
        }
    }

    fn ctx_mut(&mut self) -> &mut ErrorContext {
        match self {
            BuilderError::UnknownKind { ctx, .. }
            | BuilderError::InvalidInitargs { ctx, .. }
            | BuilderError::Cardinality { ctx, .. }
            | BuilderError::DuplicateKey { ctx, .. }
            | BuilderError::KindMismatch { ctx, .. }
            | BuilderError::UnknownRelation { ctx, .. }
            | BuilderError::UnknownNode { ctx, .. }
            | BuilderError::InvalidState { ctx, .. }
            | BuilderError::Visit { ctx, .. }
            | BuilderError::Config { ctx, .. }
            | BuilderError::Internal { ctx, .. } => ctx,
        }
    }

    /// Returns the type-safe error classification for this error.
    pub fn error_type(&self) -> ErrorType {
        match self {
            BuilderError::UnknownKind { .. } => ErrorType::UnknownKind,
            BuilderError::InvalidInitargs { .. } => ErrorType::InvalidInitargs,
            BuilderError::Cardinality { .. } => ErrorType::Cardinality,
            BuilderError::DuplicateKey { .. } => ErrorType::DuplicateKey,
            BuilderError::KindMismatch { .. } => ErrorType::KindMismatch,
            BuilderError::UnknownRelation { .. } => ErrorType::UnknownRelation,
            BuilderError::UnknownNode { .. } => ErrorType::UnknownNode,
            BuilderError::InvalidState { .. } => ErrorType::InvalidState,
            BuilderError::Visit { .. } => ErrorType::Visit,
            BuilderError::Config { .. } => ErrorType::Config,
            BuilderError::Internal { .. } => ErrorType::Internal,
        }
    }

    /// The bare message, without the variant prefix.
    pub fn message(&self) -> &str {
        self.parts().0
    }

    /// The span of the node this error is about, if known.
    pub fn span(&self) -> Option<Span> {
        self.parts().1.span
    }

    /// Attaches the input text the failing node was produced from.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use arbor::{err_ctx, BuilderError};
    /// use arbor::node::Span;
    ///
    /// let err: BuilderError = err_ctx!(Cardinality, "second operand", Some(Span::new(2, 3)));
    /// let err = err.with_source("input", "1 + 2");
    /// assert_eq!(err.span(), Some(Span::new(2, 3)));
    /// ```
    pub fn with_source(mut self, name: impl AsRef<str>, text: impl Into<String>) -> Self {
        self.ctx_mut().source = Some(Arc::new(NamedSource::new(name, text.into())));
        self
    }

    /// Wraps an error raised by user code during a walk.
    pub fn visit<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        BuilderError::Visit {
            message: error.to_string(),
            ctx: ErrorContext::none(),
            source: Some(Box::new(error)),
        }
    }
}

impl Diagnostic for BuilderError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        Some(Box::new(format!("arbor::{}", self.error_type())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.parts()
            .1
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn std::fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.parts()
            .1
            .source
            .as_ref()
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let (message, ctx) = self.parts();
        // Spans only make sense against the text they index into.
        ctx.source.as_ref()?;
        let span = ctx.span?;
        let len = span.len().max(1);
        Some(Box::new(std::iter::once(LabeledSpan::new(
            Some(message.to_string()),
            span.start,
            len,
        ))))
    }
}

macro_rules! config_error_from {
    ($($ty:ty => $what:literal),* $(,)?) => {
        $(
            impl From<$ty> for BuilderError {
                fn from(error: $ty) -> Self {
                    BuilderError::Config {
                        message: format!("{}: {}", $what, error),
                        ctx: ErrorContext::none(),
                        source: Some(Box::new(error)),
                    }
                }
            }
        )*
    };
}

config_error_from! {
    serde_yaml::Error => "invalid YAML schema",
    serde_json::Error => "invalid JSON schema",
    std::io::Error => "cannot read schema",
}

/// Constructs a [`BuilderError`] variant with a formatted message and no context.
#[macro_export]
macro_rules! err_msg {
    ($variant:ident, $($fmt:tt)+) => {
        $crate::BuilderError::$variant {
            message: format!($($fmt)+),
            ctx: $crate::ErrorContext::none(),
            source: None,
        }
    };
}

/// Constructs a [`BuilderError`] variant with a message, an optional span and
/// an optional help line.
#[macro_export]
macro_rules! err_ctx {
    ($variant:ident, $msg:expr, $span:expr, $help:expr) => {
        $crate::BuilderError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext::with_help($span, format!("{}", $help)),
            source: None,
        }
    };
    ($variant:ident, $msg:expr, $span:expr) => {
        $crate::BuilderError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext::with_span($span),
            source: None,
        }
    };
}
