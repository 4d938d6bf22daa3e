//! External encodings and the prefix-sniffing format probe.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The XML declaration every plist-XML document written by this crate starts with.
pub const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Magic prefix of the legacy binary encoding.
pub const BINARY_MAGIC: &str = "bplist00";

const JSON_OBJECT_PREFIX: &str = "{\"";
const JSON_ARRAY_PREFIX: &str = "[";

/// Longest prefix the probe ever needs to look at.
const PROBE_LEN: usize = 64;

/// Storage encodings a plist file can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Xml,
    #[serde(rename = "binary")]
    LegacyBinary,
    Json,
    Other,
}

impl Format {
    /// Format name understood by the external conversion tool.
    /// Unknown formats are treated as XML.
    pub fn external_name(self) -> &'static str {
        match self {
            Format::Xml | Format::Other => "xml1",
            Format::LegacyBinary => "binary1",
            Format::Json => "json",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Format::Xml => "xml",
            Format::LegacyBinary => "binary",
            Format::Json => "json",
            Format::Other => "other",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = String;

    /// Accepts both the short names (`xml`, `binary`, `json`) and the external
    /// tool's names (`xml1`, `binary1`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xml" | "xml1" => Ok(Format::Xml),
            "binary" | "binary1" | "bplist" => Ok(Format::LegacyBinary),
            "json" => Ok(Format::Json),
            other => Err(format!(
                "unknown plist format '{other}' (expected xml, binary or json)"
            )),
        }
    }
}

/// Classify raw bytes by their leading characters only. Nothing is validated.
///
/// Bytes are read as (lossy) UTF-8; every prefix checked is ASCII, so a
/// binary payload after the magic does not affect the answer.
pub fn detect_format(bytes: &[u8]) -> Format {
    let head = &bytes[..bytes.len().min(PROBE_LEN)];
    let text = String::from_utf8_lossy(head);
    if text.starts_with(XML_HEADER) {
        Format::Xml
    } else if text.starts_with(BINARY_MAGIC) {
        Format::LegacyBinary
    } else if text.starts_with(JSON_OBJECT_PREFIX) || text.starts_with(JSON_ARRAY_PREFIX) {
        Format::Json
    } else {
        Format::Other
    }
}
