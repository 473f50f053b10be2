//! `[build]` section configuration.
//!
//! Contains source and output paths plus footnote resolution settings.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[build]` section in footref.toml - build pipeline configuration.
///
/// # Example
/// ```toml
/// [build]
/// content = "content"         # Collection root
/// output = "public"           # Output directory
/// extensions = ["md", "mdx"]  # Entry file extensions
///
/// [build.footnotes]
/// resolve = true
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Project root directory (usually set via CLI `--root`).
    #[serde(default = "defaults::build::root")]
    #[educe(Default = defaults::build::root())]
    pub root: Option<PathBuf>,

    /// Content directory; each subdirectory is a collection.
    #[serde(default = "defaults::build::content")]
    #[educe(Default = defaults::build::content())]
    pub content: PathBuf,

    /// Build output directory.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// File extensions (without dot) accepted as content entries.
    #[serde(default = "defaults::build::extensions")]
    #[educe(Default = defaults::build::extensions())]
    pub extensions: Vec<String>,

    /// Remove the output directory before each build.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub clean: bool,

    /// Footnote numbering settings.
    #[serde(default)]
    pub footnotes: FootnotesConfig,
}

/// `[build.footnotes]` section - deferred footnote resolution.
///
/// # Example
/// ```toml
/// [build.footnotes]
/// resolve = true           # Rewrite deferred anchors after `build`
/// warn_unmatched = true    # Log deferred anchors with no numbered anchor
/// report = "footnotes.json"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct FootnotesConfig {
    /// Run the rewrite pass at the end of `build`.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub resolve: bool,

    /// Log deferred anchors that have no matching numbered anchor.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub warn_unmatched: bool,

    /// Numbering report path, relative to the output directory.
    #[serde(default = "defaults::build::footnotes::report")]
    #[educe(Default = defaults::build::footnotes::report())]
    pub report: PathBuf,
}
