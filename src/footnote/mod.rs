//! Footnote numbering with deferred resolution.
//!
//! - **registry**: per-page identifier → number assignment
//! - **extract**: reference marker scanning over raw body text
//! - **manager**: page orchestration (deferred → scan → validate → render)
//!
//! Deferred anchors are rendered with a placeholder number. The real number
//! is written into the finished output later by [`crate::resolve`].

mod error;
pub mod extract;
pub mod manager;
mod registry;

pub use error::FootnoteError;
pub use manager::{DeferredFootnote, FootnoteContent, FootnoteManager, Renderer};
pub use registry::{FootnoteEntry, FootnoteRegistry, PLACEHOLDER};
