//! plist-XML decoder: bytes → [`Plist`].
//!
//! `quick-xml` pulls events off the input one at a time and each one is fed
//! straight into [`XmlHandler`], a small explicit state machine that builds the
//! value tree bottom-up. No DOM is built and nothing recurses, so nesting depth
//! is bounded by memory only.
//!
//! # Key design decisions
//!
//! - **Two stacks, no recursion**: open aggregates live on one stack, the
//!   dictionary keys they were opened under live on another. When a nested
//!   `<array>` or `<dict>` closes inside a dictionary, the key it belongs to is
//!   restored from the key stack before the aggregate is stored.
//! - **Text buffering**: character data may arrive in several chunks (around
//!   comments, or as CDATA sections). Chunks are concatenated and only
//!   interpreted at the matching end tag; every start tag clears the buffer.
//! - **Line ends**: raw text has CRLF and lone CR normalized to LF before
//!   entities are expanded, as an XML reader must. A `&#13;` reference still
//!   yields a carriage return.
//! - **Lenient leaves**: malformed `<data>`, `<date>`, `<integer>` and `<real>`
//!   content never aborts a parse. See [`crate::codec::fallback`].
//! - **Offline DTD**: the standard `<!DOCTYPE plist ...>` reference is accepted
//!   but its external subset is never fetched. The plist element set is fixed
//!   and known here, so nothing in the DTD is needed to read a document.

use crate::codec::decode_leaf;
use crate::document::{fresh_key, Plist};
use crate::error::{PlistError, Result};
use crate::types::{Value, ValueType};
use quick_xml::escape::unescape;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use tracing::{debug, warn};

/// Parse a plist-XML document into a [`Plist`].
///
/// Fails with [`PlistError::Xml`] on malformed XML or non-UTF-8 input, and
/// with [`PlistError::EmptyDocument`] when no value is present. Unknown
/// elements and all attributes are ignored.
pub fn parse(bytes: &[u8]) -> Result<Plist> {
    let text = std::str::from_utf8(bytes).map_err(|e| xml_error(e.to_string()))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = Reader::from_str(text);
    let mut handler = XmlHandler::new();
    // Open elements of any name; the handler only tracks plist aggregates.
    let mut depth = 0usize;
    let mut closed_root = false;

    loop {
        let event = reader.read_event().map_err(|e| {
            xml_error(format!("{e} (at byte {})", reader.buffer_position()))
        })?;
        match event {
            Event::Start(start) => {
                if depth == 0 && closed_root {
                    return Err(xml_error("more than one root element".to_string()));
                }
                depth += 1;
                let local = start.local_name();
                handler.start_element(as_text(local.as_ref())?);
            }
            Event::Empty(start) => {
                if depth == 0 && closed_root {
                    return Err(xml_error("more than one root element".to_string()));
                }
                let local = start.local_name();
                let name = as_text(local.as_ref())?;
                handler.start_element(name);
                handler.end_element(name)?;
                closed_root |= depth == 0;
            }
            Event::End(end) => {
                depth = depth.saturating_sub(1);
                let local = end.local_name();
                handler.end_element(as_text(local.as_ref())?)?;
                closed_root |= depth == 0;
            }
            Event::Text(raw) if depth > 0 => {
                let normalized = normalize_line_ends(as_text(&raw)?);
                let chunk = unescape(&normalized).map_err(|e| xml_error(e.to_string()))?;
                handler.characters(&chunk);
            }
            Event::CData(raw) if depth > 0 => {
                handler.characters(&normalize_line_ends(as_text(&raw)?));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if depth > 0 {
        return Err(xml_error(format!(
            "unexpected end of document, {depth} element(s) still open"
        )));
    }
    if !closed_root {
        return Err(xml_error("no root element".to_string()));
    }

    let plist = Plist::new(handler.finish()?);
    debug!(
        bytes = bytes.len(),
        nodes = plist.node_count(),
        "parsed plist document"
    );
    Ok(plist)
}

fn xml_error(message: String) -> PlistError {
    PlistError::Xml { message }
}

/// Raw event bytes as text. The input was checked as UTF-8 up front, so this
/// only fails if an event boundary splits a character.
fn as_text(raw: &[u8]) -> Result<&str> {
    std::str::from_utf8(raw).map_err(|e| xml_error(e.to_string()))
}

/// XML end-of-line handling: `\r\n` and lone `\r` become `\n`.
fn normalize_line_ends(raw: &str) -> Cow<'_, str> {
    if !raw.contains('\r') {
        return Cow::Borrowed(raw);
    }
    Cow::Owned(raw.replace("\r\n", "\n").replace('\r', "\n"))
}

/// An aggregate whose closing tag has not been seen yet.
#[derive(Debug)]
enum OpenAggregate {
    Array(Vec<Value>),
    Dictionary(Vec<(String, Value)>),
}

impl OpenAggregate {
    fn into_value(self) -> Value {
        match self {
            OpenAggregate::Array(items) => Value::Array(items),
            OpenAggregate::Dictionary(entries) => Value::Dictionary(entries),
        }
    }
}

/// Event-driven plist builder.
///
/// Feed it `start_element` / `characters` / `end_element` events in document
/// order, then call [`XmlHandler::finish`]. Only local tag names matter.
#[derive(Debug, Default)]
pub struct XmlHandler {
    text: String,
    aggregates: Vec<OpenAggregate>,
    keys: Vec<Option<String>>,
    pending_key: Option<String>,
    root: Option<Value>,
}

impl XmlHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_element(&mut self, name: &str) {
        self.text.clear();
        let aggregate = match name {
            "array" => OpenAggregate::Array(Vec::new()),
            "dict" => OpenAggregate::Dictionary(Vec::new()),
            _ => return,
        };
        // Every aggregate opened inside a dictionary saves its key, even a
        // missing one, so the stack stays aligned with the open dictionaries.
        let key = self.pending_key.take();
        if matches!(self.aggregates.last(), Some(OpenAggregate::Dictionary(_))) {
            self.keys.push(key);
        }
        self.aggregates.push(aggregate);
    }

    /// Append a chunk of character data to the text buffer.
    pub fn characters(&mut self, chunk: &str) {
        self.text.push_str(chunk);
    }

    pub fn end_element(&mut self, name: &str) -> Result<()> {
        let value = match name {
            "true" => Value::Boolean(true),
            "false" => Value::Boolean(false),
            "data" => decode_leaf(ValueType::Data, &self.take_text()),
            "date" => decode_leaf(ValueType::Date, &self.take_text()),
            "integer" => decode_leaf(ValueType::Integer, &self.take_text()),
            "real" => decode_leaf(ValueType::Real, &self.take_text()),
            "string" => Value::String(self.take_text()),
            "key" => {
                self.pending_key = Some(self.take_text());
                return Ok(());
            }
            "array" | "dict" => {
                let Some(aggregate) = self.aggregates.pop() else {
                    return Ok(());
                };
                if matches!(self.aggregates.last(), Some(OpenAggregate::Dictionary(_))) {
                    self.pending_key = self.keys.pop().flatten();
                }
                aggregate.into_value()
            }
            _ => return Ok(()),
        };
        self.push_value(name, value)
    }

    /// The finished root value.
    pub fn finish(self) -> Result<Value> {
        self.root.ok_or(PlistError::EmptyDocument)
    }

    fn take_text(&mut self) -> String {
        std::mem::take(&mut self.text)
    }

    fn push_value(&mut self, tag: &str, value: Value) -> Result<()> {
        let Some(top) = self.aggregates.last_mut() else {
            if self.root.is_some() {
                return Err(PlistError::UnexpectedValue {
                    tag: tag.to_string(),
                });
            }
            self.root = Some(value);
            return Ok(());
        };
        match top {
            OpenAggregate::Array(items) => {
                // A stray <key> inside an array is dropped with the value.
                self.pending_key = None;
                items.push(value);
            }
            OpenAggregate::Dictionary(entries) => {
                let key = match self.pending_key.take() {
                    Some(key) => key,
                    None => {
                        let key = fresh_key(entries.iter().map(|(k, _)| k.as_str()));
                        warn!(tag, %key, "dictionary value without <key>, generated a name");
                        key
                    }
                };
                entries.push((key, value));
            }
        }
        Ok(())
    }
}
