//! A single content entry: optional TOML front matter plus a raw body.
//!
//! ```text
//! +++
//! id = "getting-started"
//! title = "Getting Started"
//! order = 1
//! +++
//! Body text with <FootnoteRef id="setup" /> markers.
//! ```

use super::ContentError;
use crate::footnote::FootnoteContent;
use serde::Deserialize;
use std::path::Path;

/// Front matter delimiter line.
const FRONT_MATTER_FENCE: &str = "+++";

/// Fields accepted in an entry's front matter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntryMeta {
    /// Stable identifier used by page article lists. Defaults to the slug.
    pub id: Option<String>,
    pub title: Option<String>,
    /// Sort key for `by-order` article lists. Missing counts as 0.
    pub order: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub collection: String,
    /// Path relative to the collection directory, without extension.
    pub slug: String,
    pub meta: EntryMeta,
    pub body: String,
}

impl Entry {
    /// Parse an entry from file text.
    pub fn parse(
        collection: &str,
        slug: &str,
        path: &Path,
        text: &str,
    ) -> Result<Self, ContentError> {
        let (front, body) = split_front_matter(text)
            .ok_or_else(|| ContentError::UnclosedFrontMatter(path.to_path_buf()))?;

        let meta = match front {
            Some(front) => toml::from_str(front).map_err(|source| ContentError::FrontMatter {
                path: path.to_path_buf(),
                source,
            })?,
            None => EntryMeta::default(),
        };

        Ok(Self {
            collection: collection.to_owned(),
            slug: slug.to_owned(),
            meta,
            body: body.to_owned(),
        })
    }

    pub fn id(&self) -> &str {
        self.meta.id.as_deref().unwrap_or(&self.slug)
    }

    pub fn order(&self) -> i64 {
        self.meta.order.unwrap_or(0)
    }

    /// `collection/slug`
    pub fn source(&self) -> String {
        format!("{}/{}", self.collection, self.slug)
    }
}

impl FootnoteContent for Entry {
    fn body(&self) -> &str {
        &self.body
    }
}

/// Split `text` into `(front matter, body)`.
///
/// Returns `None` when an opening fence has no closing fence.
fn split_front_matter(text: &str) -> Option<(Option<&str>, &str)> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let Some(rest) = strip_fence_line(text) else {
        return Some((None, text));
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FRONT_MATTER_FENCE {
            let front = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((Some(front), body));
        }
        offset += line.len();
    }
    None
}

/// Text after the opening fence line, if `text` starts with one.
fn strip_fence_line(text: &str) -> Option<&str> {
    let (first, rest) = text.split_once('\n').unwrap_or((text, ""));
    (first.trim_end() == FRONT_MATTER_FENCE).then_some(rest)
}
