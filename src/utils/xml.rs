//! XML/HTML event helpers.

use quick_xml::{Reader, Writer, events::BytesStart};
use std::borrow::Cow;
use std::io::Cursor;

pub type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// Create a reader that keeps whitespace and tolerates loose HTML.
#[inline]
pub fn create_xml_reader(content: &[u8]) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(content);
    reader.config_mut().trim_text(false);
    reader.config_mut().enable_all_checks(false);
    reader
}

#[inline]
pub fn create_xml_writer(capacity: usize) -> XmlWriter {
    Writer::new(Cursor::new(Vec::with_capacity(capacity)))
}

/// Raw value of the first attribute named `key`, if present.
pub fn attr_value<'a>(elem: &'a BytesStart<'_>, key: &[u8]) -> Option<Cow<'a, [u8]>> {
    elem.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| attr.value)
}

/// Attribute value as a string (lossy for invalid UTF-8).
pub fn attr_str(elem: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    attr_value(elem, key).map(|v| String::from_utf8_lossy(&v).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::events::Event;

    fn first_start(content: &[u8]) -> BytesStart<'_> {
        let mut reader = create_xml_reader(content);
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) | Event::Empty(e) => return e,
                Event::Eof => panic!("no element"),
                _ => {}
            }
        }
    }

    #[test]
    fn test_attr_str() {
        let elem = first_start(br#"<a data-x="1" href='#y'>t</a>"#);
        assert_eq!(attr_str(&elem, b"data-x").as_deref(), Some("1"));
        assert_eq!(attr_str(&elem, b"href").as_deref(), Some("#y"));
        assert_eq!(attr_str(&elem, b"missing"), None);
    }

    #[test]
    fn test_reader_keeps_whitespace() {
        let mut reader = create_xml_reader(b"<p>  a  </p>");
        reader.read_event().unwrap();
        match reader.read_event().unwrap() {
            Event::Text(t) => assert_eq!(&*t, b"  a  "),
            other => panic!("unexpected {other:?}"),
        }
    }
}
