//! Deferred anchor rewriting for a single output unit.
//!
//! Two passes over the same bytes:
//!
//! 1. Scan: count deferred anchors and map `id → number` from normal anchors.
//!    Stops here when the unit has no deferred anchors.
//! 2. Rewrite: copy every event through unchanged, except the text of deferred
//!    anchors whose id has a normal counterpart.
//!
//! The unit is reported as changed only if some anchor text actually differs,
//! so a second run over resolved output is a no-op.

use crate::render::{ATTR_DEFERRED, ATTR_FOOTNOTE_ID};
use crate::utils::xml::{XmlWriter, attr_str, attr_value, create_xml_reader, create_xml_writer};
use anyhow::{Result, bail};
use quick_xml::{
    Reader,
    events::{BytesStart, BytesText, Event},
};
use rustc_hash::FxHashMap;

/// A deferred anchor whose text was replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub id: String,
    pub from: String,
    pub to: String,
}

/// Outcome of rewriting one unit.
#[derive(Debug, Default)]
pub struct Rewrite {
    /// New content, or `None` when the unit must be left untouched.
    pub content: Option<Vec<u8>>,
    pub resolved: Vec<Resolved>,
    /// Deferred anchors with no normal anchor of the same id.
    pub unmatched: Vec<String>,
}

impl Rewrite {
    pub fn is_changed(&self) -> bool {
        self.content.is_some()
    }
}

/// Kind of footnote anchor, read from its `data-deferred` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Anchor {
    id: String,
    deferred: bool,
}

impl Anchor {
    /// Anchors need both attributes; other `data-deferred` values are ignored.
    fn from_elem(elem: &BytesStart<'_>) -> Option<Self> {
        let deferred = match attr_value(elem, ATTR_DEFERRED.as_bytes())?.as_ref() {
            b"true" => true,
            b"false" => false,
            _ => return None,
        };
        let id = attr_str(elem, ATTR_FOOTNOTE_ID.as_bytes())?;
        Some(Self { id, deferred })
    }
}

/// Result of the scan pass.
#[derive(Debug, Default)]
struct Scan {
    deferred: usize,
    numbers: FxHashMap<String, String>,
}

/// Resolve deferred anchors in one HTML document.
pub fn rewrite_html(content: &[u8]) -> Result<Rewrite> {
    let scan = scan_anchors(content)?;
    if scan.deferred == 0 {
        return Ok(Rewrite::default());
    }
    rewrite_deferred(content, &scan.numbers)
}

fn parse_error(reader: &Reader<&[u8]>, err: quick_xml::Error) -> anyhow::Error {
    anyhow::anyhow!(
        "XML parse error at position {}: {:?}",
        reader.error_position(),
        err
    )
}

fn scan_anchors(content: &[u8]) -> Result<Scan> {
    let mut reader = create_xml_reader(content);
    let mut scan = Scan::default();
    // (anchor, text so far, nesting depth inside the anchor)
    let mut current: Option<(Anchor, String, usize)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(elem)) => match current.as_mut() {
                Some((_, _, depth)) => *depth += 1,
                None => current = Anchor::from_elem(&elem).map(|a| (a, String::new(), 0)),
            },
            Ok(Event::Empty(elem)) if current.is_none() => {
                if Anchor::from_elem(&elem).is_some_and(|a| a.deferred) {
                    scan.deferred += 1;
                }
            }
            Ok(Event::Text(text)) => {
                if let Some((_, buf, _)) = current.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(text.as_ref()));
                }
            }
            Ok(Event::End(_)) => match current.take() {
                Some((anchor, buf, 0)) => {
                    if anchor.deferred {
                        scan.deferred += 1;
                    } else {
                        let number = buf.trim();
                        if !number.is_empty() {
                            scan.numbers.insert(anchor.id, number.to_owned());
                        }
                    }
                }
                Some((anchor, buf, depth)) => current = Some((anchor, buf, depth - 1)),
                None => {}
            },
            Ok(Event::Eof) if current.is_some() => bail!("unclosed footnote anchor"),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(parse_error(&reader, e)),
        }
    }

    Ok(scan)
}

fn rewrite_deferred(content: &[u8], numbers: &FxHashMap<String, String>) -> Result<Rewrite> {
    let mut reader = create_xml_reader(content);
    let mut writer = create_xml_writer(content.len());
    let mut rewrite = Rewrite::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(elem)) => {
                let anchor = Anchor::from_elem(&elem).filter(|a| a.deferred);
                let Some(anchor) = anchor else {
                    writer.write_event(Event::Start(elem))?;
                    continue;
                };
                writer.write_event(Event::Start(elem))?;
                let inner = read_inner(&mut reader)?;
                match numbers.get(&anchor.id) {
                    Some(number) if inner.text.trim() != number.as_str() => {
                        writer.write_event(Event::Text(BytesText::new(number)))?;
                        rewrite.resolved.push(Resolved {
                            id: anchor.id,
                            from: inner.text.trim().to_owned(),
                            to: number.clone(),
                        });
                    }
                    found => {
                        if found.is_none() {
                            rewrite.unmatched.push(anchor.id);
                        }
                        write_all(&mut writer, &inner.events)?;
                    }
                }
                writer.write_event(Event::End(inner.end))?;
            }
            Ok(Event::Empty(elem)) => {
                let anchor = Anchor::from_elem(&elem).filter(|a| a.deferred);
                match anchor.map(|a| (numbers.get(&a.id), a)) {
                    Some((Some(number), anchor)) => {
                        let end = elem.to_end().into_owned();
                        writer.write_event(Event::Start(elem))?;
                        writer.write_event(Event::Text(BytesText::new(number)))?;
                        writer.write_event(Event::End(end))?;
                        rewrite.resolved.push(Resolved {
                            id: anchor.id,
                            from: String::new(),
                            to: number.clone(),
                        });
                    }
                    Some((None, anchor)) => {
                        rewrite.unmatched.push(anchor.id);
                        writer.write_event(Event::Empty(elem))?;
                    }
                    None => writer.write_event(Event::Empty(elem))?,
                }
            }
            Ok(Event::Eof) => break,
            Ok(event) => writer.write_event(event)?,
            Err(e) => return Err(parse_error(&reader, e)),
        }
    }

    if !rewrite.resolved.is_empty() {
        rewrite.content = Some(writer.into_inner().into_inner());
    }
    Ok(rewrite)
}

/// Everything between an anchor's start tag and its matching end tag.
struct Inner {
    events: Vec<Event<'static>>,
    text: String,
    end: quick_xml::events::BytesEnd<'static>,
}

fn read_inner(reader: &mut Reader<&[u8]>) -> Result<Inner> {
    let mut events = Vec::new();
    let mut text = String::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(elem)) => {
                depth += 1;
                events.push(Event::Start(elem.into_owned()));
            }
            Ok(Event::End(end)) if depth == 0 => {
                return Ok(Inner {
                    events,
                    text,
                    end: end.into_owned(),
                });
            }
            Ok(Event::End(end)) => {
                depth -= 1;
                events.push(Event::End(end.into_owned()));
            }
            Ok(Event::Text(t)) => {
                text.push_str(&String::from_utf8_lossy(t.as_ref()));
                events.push(Event::Text(t.into_owned()));
            }
            Ok(Event::Eof) => bail!("unclosed footnote anchor"),
            Ok(event) => events.push(event.into_owned()),
            Err(e) => return Err(parse_error(reader, e)),
        }
    }
}

fn write_all(writer: &mut XmlWriter, events: &[Event<'static>]) -> Result<()> {
    for event in events {
        writer.write_event(event.borrow())?;
    }
    Ok(())
}
