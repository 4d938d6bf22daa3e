//! plist-XML encoder: [`Plist`] → canonical XML bytes.
//!
//! Output is deterministic: one element per line, no indentation, children in
//! insertion order. Serializing a parsed document again yields the same bytes.
//!
//! ```
//! use plist_core::{serialize, Plist, Value};
//!
//! let plist = Plist::new(Value::dictionary([("Version", Value::Integer(1))]));
//! let xml = String::from_utf8(serialize(&plist)).unwrap();
//! assert!(xml.contains("<dict>\n<key>Version</key>\n<integer>1</integer>\n</dict>\n"));
//! ```

use crate::codec;
use crate::document::{NodeId, Plist};
use crate::format::XML_HEADER;
use crate::types::{Value, ValueType};
use tracing::debug;

/// Doctype line of the plist-1.0 document type.
pub const PLIST_DOCTYPE: &str = r#"<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">"#;

const PLIST_OPEN: &str = r#"<plist version="1.0">"#;
const PLIST_CLOSE: &str = "</plist>";

/// Serialize a document to UTF-8 plist-XML, including the XML declaration,
/// doctype and `<plist version="1.0">` envelope.
pub fn serialize(plist: &Plist) -> Vec<u8> {
    let xml = to_xml_string(plist);
    debug!(bytes = xml.len(), nodes = plist.node_count(), "serialized plist document");
    xml.into_bytes()
}

/// [`serialize`], as a `String`.
pub fn to_xml_string(plist: &Plist) -> String {
    let mut out = String::new();
    out.push_str(XML_HEADER);
    out.push('\n');
    out.push_str(PLIST_DOCTYPE);
    out.push('\n');
    out.push_str(PLIST_OPEN);
    out.push('\n');
    write_node(plist, plist.root(), &mut out);
    out.push_str(PLIST_CLOSE);
    out.push('\n');
    out
}

/// Pending encoder work: a node to open, or an aggregate's closing tag.
enum Step {
    Node(NodeId),
    Key(String),
    Close(&'static str),
}

/// Append the XML for the subtree at `id`. Stale handles write nothing.
///
/// Walks an explicit stack, so nesting depth does not grow the call stack.
pub fn write_node(plist: &Plist, id: NodeId, out: &mut String) {
    let mut steps = vec![Step::Node(id)];
    while let Some(step) = steps.pop() {
        let id = match step {
            Step::Node(id) => id,
            Step::Key(key) => {
                out.push_str("<key>");
                escape_into(&key, out);
                out.push_str("</key>\n");
                continue;
            }
            Step::Close(tag) => {
                out.push_str(tag);
                continue;
            }
        };
        match plist.value_type(id) {
            Some(ValueType::Dictionary) => {
                out.push_str("<dict>\n");
                steps.push(Step::Close("</dict>\n"));
                for entry in plist.elements(id).unwrap_or_default().into_iter().rev() {
                    let (key, child) = entry.into_parts();
                    steps.push(Step::Node(child));
                    steps.push(Step::Key(key.unwrap_or_default()));
                }
            }
            Some(ValueType::Array) => {
                out.push_str("<array>\n");
                steps.push(Step::Close("</array>\n"));
                for entry in plist.elements(id).unwrap_or_default().into_iter().rev() {
                    steps.push(Step::Node(*entry.value()));
                }
            }
            Some(_) => {
                if let Some(value) = plist.primitive(id) {
                    write_primitive(value, out);
                }
            }
            None => {}
        }
    }
}

fn write_primitive(value: &Value, out: &mut String) {
    match value {
        Value::Boolean(true) => out.push_str("<true/>\n"),
        Value::Boolean(false) => out.push_str("<false/>\n"),
        Value::Data(bytes) => {
            out.push_str("<data>\n");
            out.push_str(&codec::encode_base64_wrapped(bytes));
            out.push_str("</data>\n");
        }
        Value::Date(date) => {
            out.push_str("<date>");
            out.push_str(&codec::format_date(date));
            out.push_str("</date>\n");
        }
        Value::Real(real) => {
            out.push_str("<real>");
            out.push_str(&codec::format_real(*real));
            out.push_str("</real>\n");
        }
        Value::Integer(n) => {
            out.push_str("<integer>");
            out.push_str(&n.to_string());
            out.push_str("</integer>\n");
        }
        Value::String(s) => {
            out.push_str("<string>");
            escape_into(s, out);
            out.push_str("</string>\n");
        }
        Value::Array(_) | Value::Dictionary(_) => {}
    }
}

/// Escape markup characters. Carriage returns become a character reference
/// because XML readers normalize literal ones away.
fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(c),
        }
    }
}
