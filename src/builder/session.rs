//! Scoped construction sessions.

use super::{Builder, SessionOutcome};
use crate::BuilderError;
use tracing::{debug, warn};

/// Closes the session on drop unless it was closed explicitly, so unwinding
/// out of the body still reaches `finish_session`.
struct Session<'b, B: Builder> {
    builder: &'b mut B,
    open: bool,
}

impl<B: Builder> Session<'_, B> {
    fn close(&mut self, outcome: SessionOutcome) -> Result<(), BuilderError> {
        self.open = false;
        debug!(?outcome, "closing construction session");
        self.builder.finish_session(outcome)
    }
}

impl<B: Builder> Drop for Session<'_, B> {
    fn drop(&mut self) {
        if self.open {
            self.open = false;
            debug!("closing construction session during unwind");
            if let Err(error) = self.builder.finish_session(SessionOutcome::Aborted) {
                warn!(%error, "construction session failed to close");
            }
        }
    }
}

/// Runs `body` inside a construction session on `builder`.
///
/// `prepare` runs first; if it fails nothing else happens. The body runs
/// through the builder's `wrap`. `finish_session` then runs exactly once,
/// whether the body returned `Ok`, returned `Err`, or panicked. A body error
/// wins over a close error.
///
/// # Examples
///
/// ```rust
/// use arbor::builder::{make_finish_node, with_builder};
/// use arbor::list::ListBuilder;
/// use arbor::node::Initargs;
///
/// let mut builder = ListBuilder::new();
/// let leaf = with_builder(&mut builder, |b| {
///     make_finish_node(b, "literal", Initargs::new().with("value", 5))
/// })
/// .unwrap();
/// assert_eq!(leaf.kind(), "literal");
/// ```
pub fn with_builder<B, R, F>(builder: &mut B, body: F) -> Result<R, BuilderError>
where
    B: Builder,
    F: FnOnce(&mut B) -> Result<R, BuilderError>,
{
    builder.prepare()?;
    debug!("opened construction session");
    let mut session = Session {
        builder,
        open: true,
    };
    let result = session.builder.wrap(body);
    let outcome = match &result {
        Ok(_) => SessionOutcome::Completed,
        Err(_) => SessionOutcome::Aborted,
    };
    let closed = session.close(outcome);
    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(error)) => Err(error),
        (Err(error), Ok(())) => Err(error),
        (Err(error), Err(close_error)) => {
            warn!(%close_error, "session close error superseded by body error");
            Err(error)
        }
    }
}
