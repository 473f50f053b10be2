//! Reference marker scanning over raw body text.
//!
//! Bodies are scanned before rendering, while they are still source text and
//! not necessarily well-formed markup, so a regex is used instead of a parser.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Tag name of a footnote reference marker in source text.
pub const FOOTNOTE_REF_TAG: &str = "FootnoteRef";

/// `<FootnoteRef ... id="ID" ... />` with either quote, self-closing or not.
static RE_FOOTNOTE_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<FootnoteRef\b[^>]*?\sid\s*=\s*(?:"([^"]+)"|'([^']+)')[^>]*>"#).unwrap()
});

/// A reference marker found in body text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FootnoteRef<'a> {
    /// Footnote identifier from the `id` attribute.
    pub id: &'a str,
    /// Byte range of the whole marker in the scanned text.
    pub start: usize,
    pub end: usize,
}

impl<'a> FootnoteRef<'a> {
    fn from_captures(caps: &Captures<'a>) -> Option<Self> {
        let whole = caps.get(0)?;
        let id = caps.get(1).or_else(|| caps.get(2))?;
        Some(Self {
            id: id.as_str(),
            start: whole.start(),
            end: whole.end(),
        })
    }
}

/// Find every reference marker in `text`, in textual order.
pub fn find_footnote_refs(text: &str) -> impl Iterator<Item = FootnoteRef<'_>> {
    RE_FOOTNOTE_REF
        .captures_iter(text)
        .filter_map(|caps| FootnoteRef::from_captures(&caps))
}

/// Identifiers of every reference marker in `text`, in textual order.
#[inline]
pub fn footnote_ids(text: &str) -> impl Iterator<Item = &str> {
    find_footnote_refs(text).map(|r| r.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(text: &str) -> Vec<&str> {
        footnote_ids(text).collect()
    }

    #[test]
    fn test_self_closing_double_quotes() {
        assert_eq!(ids(r#"Text<FootnoteRef id="one" /> more."#), vec!["one"]);
    }

    #[test]
    fn test_single_quotes() {
        assert_eq!(ids("a <FootnoteRef id='two'/> b"), vec!["two"]);
    }

    #[test]
    fn test_not_self_closing() {
        assert_eq!(ids(r#"<FootnoteRef id="x"></FootnoteRef>"#), vec!["x"]);
    }

    #[test]
    fn test_extra_attributes() {
        let text = r#"<FootnoteRef class="c" id="mid" data-extra="1" />"#;
        assert_eq!(ids(text), vec!["mid"]);
    }

    #[test]
    fn test_spaces_around_equals() {
        assert_eq!(ids(r#"<FootnoteRef id = "spaced" />"#), vec!["spaced"]);
    }

    #[test]
    fn test_ignores_lookalike_attribute() {
        // `data-id` must not be mistaken for `id`
        let text = r#"<FootnoteRef data-id="wrong" id="right" />"#;
        assert_eq!(ids(text), vec!["right"]);
    }

    #[test]
    fn test_ignores_other_tags() {
        let text = r#"<FootnoteRefs id="a" /><Footnote id="b" /><span id="c"></span>"#;
        assert!(ids(text).is_empty());
    }

    #[test]
    fn test_order_across_lines() {
        let text = "first <FootnoteRef id=\"b\" />\nsecond <FootnoteRef id=\"a\" />\n\
                    third <FootnoteRef id=\"b\" />";
        assert_eq!(ids(text), vec!["b", "a", "b"]);
    }

    #[test]
    fn test_marker_span() {
        let text = r#"ab<FootnoteRef id="z"/>cd"#;
        let found: Vec<_> = find_footnote_refs(text).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(&text[found[0].start..found[0].end], r#"<FootnoteRef id="z"/>"#);
    }

    #[test]
    fn test_tag_constant_matches_pattern() {
        let text = format!(r#"<{FOOTNOTE_REF_TAG} id="k" />"#);
        assert_eq!(ids(&text), vec!["k"]);
    }
}
