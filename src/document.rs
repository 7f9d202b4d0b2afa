//! XML document trees for backup exports.
//!
//! Exports are read into a small owned [`Element`] tree and the merged result
//! is written back from one. Reading is deliberately forgiving: exporting
//! apps produce end tags that do not match, truncated files, and UTF-16
//! surrogate pairs written as two separate character references.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};
use tracing::{debug, warn};

use crate::error::{MergeError, Result};

const REPLACEMENT: char = '\u{FFFD}';
/// Longest entity or character reference name recognised
const MAX_REFERENCE_LEN: usize = 32;

/// An element with ordered string attributes and child elements.
///
/// Text content is not kept; backup exports carry everything in attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Tag name
    pub tag: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Child elements in document order
    pub children: Vec<Element>,
}

impl Element {
    /// Create an element with no attributes or children
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into(), ..Self::default() }
    }

    /// Value of an attribute
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing the value in place if it already exists
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// First child with the given tag
    #[must_use]
    pub fn find(&self, tag: &str) -> Option<&Self> {
        self.children.iter().find(|child| child.tag == tag)
    }

    /// All children with the given tag
    pub fn find_all<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.children.iter().filter(move |child| child.tag == tag)
    }

    /// Append a child element
    pub fn push(&mut self, child: Self) {
        self.children.push(child);
    }
}

/// Parse an XML file into an element tree.
pub fn parse_document(path: &Path) -> Result<Element> {
    let file = File::open(path)?;
    parse_reader(BufReader::new(file), &path.display().to_string())
}

/// Parse XML held in memory.
pub fn parse_str(xml: &str) -> Result<Element> {
    parse_reader(xml.as_bytes(), "<memory>")
}

/// Parse XML from any buffered reader. `source_name` labels errors.
pub fn parse_reader<R: BufRead>(input: R, source_name: &str) -> Result<Element> {
    let mut reader = Reader::from_reader(input);
    let config = reader.config_mut();
    config.trim_text(true);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut buf = Vec::new();
    let mut open: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(start)) => open.push(element_from_start(&start)),
            Ok(Event::Empty(start)) => {
                let element = element_from_start(&start);
                attach(&mut open, &mut root, element);
            }
            Ok(Event::End(_)) => match open.pop() {
                Some(element) => attach(&mut open, &mut root, element),
                None => debug!(source = source_name, "Ignoring stray end tag"),
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(MergeError::Parse {
                    source_name: source_name.to_string(),
                    position: reader.buffer_position() as u64,
                    message: err.to_string(),
                });
            }
        }
        buf.clear();
    }

    if !open.is_empty() {
        warn!(source = source_name, unclosed = open.len(), "Document ended with unclosed elements");
        while let Some(element) = open.pop() {
            attach(&mut open, &mut root, element);
        }
    }

    root.ok_or_else(|| MergeError::Parse {
        source_name: source_name.to_string(),
        position: reader.buffer_position() as u64,
        message: "no root element".to_string(),
    })
}

fn attach(open: &mut [Element], root: &mut Option<Element>, element: Element) {
    if let Some(parent) = open.last_mut() {
        parent.push(element);
    } else if root.is_none() {
        *root = Some(element);
    } else {
        warn!(tag = %element.tag, "Ignoring element after the document root");
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Element {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
    for attribute in start.attributes().with_checks(false) {
        match attribute {
            Ok(attribute) => {
                let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
                let value = unescape_lenient(&String::from_utf8_lossy(&attribute.value));
                element.attributes.push((key, value));
            }
            Err(err) => warn!(tag = %element.tag, error = %err, "Skipping malformed attribute"),
        }
    }
    element
}

/// Resolve entity and character references without ever failing.
///
/// Surrogate pairs encoded as two references are combined, lone surrogates
/// and invalid code points become U+FFFD, unknown entities stay verbatim.
#[must_use]
pub fn unescape_lenient(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut high: Option<u32> = None;
    let mut rest = raw;

    while let Some(amp) = rest.find('&') {
        let (text, tail) = rest.split_at(amp);
        if !text.is_empty() {
            flush_surrogate(&mut out, &mut high);
            out.push_str(text);
        }
        let Some(name) = reference_name(&tail[1..]) else {
            flush_surrogate(&mut out, &mut high);
            out.push('&');
            rest = &tail[1..];
            continue;
        };
        match decode_reference(name) {
            Some(code @ 0xD800..=0xDBFF) => {
                flush_surrogate(&mut out, &mut high);
                high = Some(code);
            }
            Some(code @ 0xDC00..=0xDFFF) => match high.take() {
                Some(lead) => {
                    let combined = 0x10000 + ((lead - 0xD800) << 10) + (code - 0xDC00);
                    out.push(char::from_u32(combined).unwrap_or(REPLACEMENT));
                }
                None => out.push(REPLACEMENT),
            },
            Some(code) => {
                flush_surrogate(&mut out, &mut high);
                out.push(char::from_u32(code).filter(|c| *c != '\0').unwrap_or(REPLACEMENT));
            }
            None => {
                flush_surrogate(&mut out, &mut high);
                out.push('&');
                out.push_str(name);
                out.push(';');
            }
        }
        rest = &tail[name.len() + 2..];
    }

    flush_surrogate(&mut out, &mut high);
    out.push_str(rest);
    out
}

/// Name of the reference at the start of `text`, when a `;` closes it
/// within [`MAX_REFERENCE_LEN`] name characters.
fn reference_name(text: &str) -> Option<&str> {
    let end = text
        .bytes()
        .take(MAX_REFERENCE_LEN + 1)
        .position(|b| !(b.is_ascii_alphanumeric() || b == b'#'))?;
    (end > 0 && text.as_bytes()[end] == b';').then(|| &text[..end])
}

fn flush_surrogate(out: &mut String, high: &mut Option<u32>) {
    if high.take().is_some() {
        out.push(REPLACEMENT);
    }
}

fn decode_reference(name: &str) -> Option<u32> {
    match name {
        "lt" => Some('<' as u32),
        "gt" => Some('>' as u32),
        "amp" => Some('&' as u32),
        "quot" => Some('"' as u32),
        "apos" => Some('\'' as u32),
        _ => {
            let number = name.strip_prefix('#')?;
            match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => number.parse().ok(),
            }
        }
    }
}

/// Escape an attribute value so it survives a read back unchanged.
///
/// Whitespace control characters are written as character references;
/// literal ones would be normalised to spaces by any conforming reader.
#[must_use]
pub fn escape_attribute(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '<', '>', '"', '\'', '\n', '\r', '\t']) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 16);
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\n' => escaped.push_str("&#10;"),
            '\r' => escaped.push_str("&#13;"),
            '\t' => escaped.push_str("&#9;"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

/// Serialize a tree as a standalone UTF-8 document with two-space indentation.
pub fn to_bytes(root: &Element) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    write_element(&mut writer, root)?;
    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.tag.as_str());
    for (key, value) in &element.attributes {
        let escaped = escape_attribute(value);
        start.push_attribute(Attribute {
            key: QName(key.as_bytes()),
            value: Cow::Borrowed(escaped.as_bytes()),
        });
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
    } else {
        writer.write_event(Event::Start(start))?;
        for child in &element.children {
            write_element(writer, child)?;
        }
        writer.write_event(Event::End(BytesEnd::new(element.tag.as_str())))?;
    }
    Ok(())
}
