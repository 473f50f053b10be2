//! `[[pages]]` section configuration.
//!
//! Each page lists the content rendered on it and the footnotes it calls out
//! in its header before the body references them.

use crate::footnote::DeferredFootnote;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File written for every page directory.
pub const PAGE_FILE: &str = "index.html";

/// How a page picks its articles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArticleStrategy {
    /// Every article, sorted by its `order` front matter.
    #[default]
    ByOrder,
    /// No articles; only `additional` entries.
    None,
}

/// `articles = "by-order"` or `articles = ["id-a", "id-b"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArticleSelection {
    Strategy(ArticleStrategy),
    /// Explicit article ids, rendered in this order.
    Ids(Vec<String>),
}

impl Default for ArticleSelection {
    fn default() -> Self {
        Self::Strategy(ArticleStrategy::default())
    }
}

/// Reference to one entry of any collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntryRef {
    pub collection: String,
    pub slug: String,
}

/// One `[[pages]]` table.
///
/// # Example
/// ```toml
/// [[pages]]
/// path = "guides"
/// title = "Guides"
/// articles = ["getting-started", "advanced-techniques"]
/// deferred = ["intro-note", { id = "other" }]
/// additional = [{ collection = "footnotes", slug = "intro" }]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageConfig {
    /// Output location relative to the output directory; `""` is the root.
    #[serde(default)]
    pub path: String,

    /// Page title; falls back to `[base].title`.
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub articles: ArticleSelection,

    /// Footnotes declared before the body references them.
    #[serde(default)]
    pub deferred: Vec<DeferredFootnote>,

    /// Entries appended after the articles.
    #[serde(default)]
    pub additional: Vec<EntryRef>,
}

impl PageConfig {
    /// `""` → `<output>/index.html`, `"a/b"` → `<output>/a/b/index.html`
    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        let path = self.normalized_path();
        let dir = if path.is_empty() {
            output_dir.to_path_buf()
        } else {
            output_dir.join(path)
        };
        dir.join(PAGE_FILE)
    }

    /// Page path without leading or trailing slashes.
    pub fn normalized_path(&self) -> &str {
        self.path.trim_matches('/')
    }

    /// Name used in logs and the footnote report.
    pub fn display_name(&self) -> &str {
        match self.normalized_path() {
            "" => "/",
            path => path,
        }
    }
}
