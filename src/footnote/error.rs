//! Footnote numbering errors.

use thiserror::Error;

/// Errors raised while numbering or rendering footnote references.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FootnoteError {
    /// Deferred footnotes that were never referenced in the page body.
    ///
    /// Carries the pending identifiers joined by `", "`.
    #[error("deferred footnotes never referenced in body: {0}")]
    DeferredNotResolved(String),

    /// A reference marker was rendered before its identifier was registered.
    #[error("footnote `{0}` was not registered before rendering")]
    MissingFootnote(String),
}
