//! HTML rendering for content bodies and pages.
//!
//! Bodies are plain prose with reference markers:
//!
//! - blank lines separate blocks
//! - a block starting with `#` .. `######` becomes a heading
//! - every other block becomes a `<p>`
//! - `<FootnoteRef id="..."/>` becomes a numbered anchor
//!
//! All other text is escaped, so rendered pages are always well-formed and
//! can be parsed again by the rewrite pass.
//!
//! # Anchor markup
//!
//! ```html
//! <sup class="footnote-ref"><a href="#fn-ID" data-footnote-id="ID" data-deferred="false">3</a></sup>
//! ```

use crate::footnote::{
    DeferredFootnote, FootnoteError, FootnoteRegistry, PLACEHOLDER, Renderer,
    extract::{FOOTNOTE_REF_TAG, find_footnote_refs},
};
use quick_xml::escape::escape;
use std::fmt::Write;

/// Attribute carrying the footnote identifier on an output anchor.
pub const ATTR_FOOTNOTE_ID: &str = "data-footnote-id";
/// Attribute marking an output anchor as deferred (`"true"`) or normal (`"false"`).
pub const ATTR_DEFERRED: &str = "data-deferred";

/// Write one footnote anchor.
pub fn write_anchor(out: &mut String, id: &str, number: u32, deferred: bool) {
    let id = escape(id);
    write!(
        out,
        r##"<sup class="footnote-ref"><a href="#fn-{id}" {ATTR_FOOTNOTE_ID}="{id}" {ATTR_DEFERRED}="{deferred}">{number}</a></sup>"##
    )
    .ok();
}

/// Renders bodies to HTML fragments.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn render(&self, body: &str, registry: &FootnoteRegistry) -> Result<String, FootnoteError> {
        let mut out = String::with_capacity(body.len() + body.len() / 2);
        for block in blocks(body) {
            match heading_level(block) {
                Some((level, text)) => {
                    write!(out, "<h{level}>").ok();
                    render_inline(&mut out, text, registry)?;
                    writeln!(out, "</h{level}>").ok();
                }
                None => {
                    out.push_str("<p>");
                    render_inline(&mut out, block, registry)?;
                    out.push_str("</p>\n");
                }
            }
        }
        Ok(out)
    }
}

/// Split a body into trimmed, non-empty blocks separated by blank lines.
///
/// A blank line inside a reference marker does not end the block.
fn blocks(body: &str) -> Vec<&str> {
    let markers: Vec<_> = find_footnote_refs(body).map(|m| m.start..m.end).collect();
    let mut blocks = Vec::new();
    let mut start = 0;
    let mut offset = 0;

    for line in body.split_inclusive('\n') {
        let in_marker = markers.iter().any(|span| span.start < offset && offset < span.end);
        if line.trim().is_empty() && !in_marker {
            push_block(&mut blocks, &body[start..offset]);
            start = offset + line.len();
        }
        offset += line.len();
    }
    push_block(&mut blocks, &body[start..]);
    blocks
}

fn push_block<'a>(blocks: &mut Vec<&'a str>, block: &'a str) {
    let block = block.trim();
    if !block.is_empty() {
        blocks.push(block);
    }
}

/// `## Title` → `(2, "Title")`.
fn heading_level(block: &str) -> Option<(usize, &str)> {
    let level = block.bytes().take_while(|&b| b == b'#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    block[level..]
        .strip_prefix(' ')
        .map(|text| (level, text.trim()))
}

/// Escape text and replace reference markers with anchors.
fn render_inline(
    out: &mut String,
    text: &str,
    registry: &FootnoteRegistry,
) -> Result<(), FootnoteError> {
    let closing = format!("</{FOOTNOTE_REF_TAG}>");
    let mut cursor = 0;

    for marker in find_footnote_refs(text) {
        out.push_str(&escape(&text[cursor..marker.start]));

        let number = registry
            .get_number(marker.id)
            .ok_or_else(|| FootnoteError::MissingFootnote(marker.id.to_owned()))?;
        write_anchor(out, marker.id, number, false);

        cursor = marker.end;
        if text[cursor..].starts_with(&closing) {
            cursor += closing.len();
        }
    }

    out.push_str(&escape(&text[cursor..]));
    Ok(())
}

/// One rendered entry placed on a page.
#[derive(Debug, Clone, Copy)]
pub struct Section<'a> {
    /// `collection/slug` of the source entry.
    pub source: &'a str,
    pub title: Option<&'a str>,
    pub html: &'a str,
}

/// Assemble a complete page.
///
/// Deferred footnotes are written as header callouts carrying the
/// placeholder number; the rewrite pass fills them in after the build.
pub fn page_html(
    title: &str,
    language: &str,
    deferred: &[DeferredFootnote],
    sections: &[Section<'_>],
) -> String {
    let body_len: usize = sections.iter().map(|s| s.html.len()).sum();
    let mut out = String::with_capacity(body_len + 512);
    let title = escape(title);

    out.push_str("<!DOCTYPE html>\n");
    writeln!(out, r#"<html lang="{}">"#, escape(language)).ok();
    out.push_str("<head>\n<meta charset=\"utf-8\"/>\n");
    writeln!(out, "<title>{title}</title>").ok();
    out.push_str("</head>\n<body>\n<header>\n");
    writeln!(out, "<h1>{title}</h1>").ok();

    if !deferred.is_empty() {
        out.push_str(r#"<p class="deferred-footnotes">"#);
        for (i, footnote) in deferred.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            write_anchor(&mut out, &footnote.id, PLACEHOLDER, true);
        }
        out.push_str("</p>\n");
    }

    out.push_str("</header>\n<main>\n");
    for section in sections {
        writeln!(out, r#"<section data-source="{}">"#, escape(section.source)).ok();
        if let Some(title) = section.title {
            writeln!(out, "<h2>{}</h2>", escape(title)).ok();
        }
        out.push_str(section.html);
        out.push_str("</section>\n");
    }
    out.push_str("</main>\n</body>\n</html>\n");
    out
}
