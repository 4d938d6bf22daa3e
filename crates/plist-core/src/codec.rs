//! Text codecs for primitive values.
//!
//! Two families live here. The persisted forms are what the XML encoding
//! stores: base64 data, `yyyy-MM-ddTHH:mm:ssZ` dates in UTC, decimal numbers.
//! The editing forms are what a user types: lowercase hex data and local
//! medium-style dates.
//!
//! Leaf decoding during a parse is lenient. [`decode_leaf`] never fails; text
//! that cannot be decoded is replaced by the kind's entry in [`fallback`].

use crate::types::{Value, ValueType};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Timelike, Utc};
use tracing::warn;

/// Persisted date layout, always interpreted in UTC.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// On-screen date layout (`Apr 12, 2011 7:21:33 AM`), in local time.
pub const DISPLAY_DATE_FORMAT: &str = "%b %-d, %Y %-I:%M:%S %p";

/// Line width of wrapped base64 in `<data>` elements.
pub const BASE64_LINE_WIDTH: usize = 76;

const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// The value substituted when a leaf of `kind` cannot be decoded.
///
/// Only data, dates and numbers can actually fail; the remaining rows exist so
/// the table is total.
pub fn fallback(kind: ValueType) -> Value {
    match kind {
        ValueType::Data => Value::Data(Vec::new()),
        ValueType::Date => Value::Date(DateTime::<Utc>::UNIX_EPOCH),
        ValueType::Integer => Value::Integer(0),
        ValueType::Real => Value::Real(0.0),
        ValueType::Boolean => Value::Boolean(false),
        ValueType::String => Value::String(String::new()),
        ValueType::Array => Value::Array(Vec::new()),
        ValueType::Dictionary => Value::Dictionary(Vec::new()),
    }
}

/// Decode element text in its persisted form.
///
/// Booleans and aggregates have no text form and are rejected.
pub fn decode_persisted(kind: ValueType, text: &str) -> Result<Value, String> {
    match kind {
        ValueType::Data => decode_base64(text).map(Value::Data),
        ValueType::Date => parse_date(text)
            .map(Value::Date)
            .ok_or_else(|| "not a yyyy-MM-ddTHH:mm:ssZ date".to_string()),
        ValueType::Integer => text
            .trim()
            .parse::<i32>()
            .map(Value::Integer)
            .map_err(|e| e.to_string()),
        ValueType::Real => parse_real(text)
            .map(Value::Real)
            .ok_or_else(|| "not a decimal number".to_string()),
        ValueType::String => Ok(Value::String(text.to_string())),
        ValueType::Boolean | ValueType::Array | ValueType::Dictionary => {
            Err(format!("{kind} has no text encoding"))
        }
    }
}

/// Decode element text, substituting the [`fallback`] value on failure.
pub fn decode_leaf(kind: ValueType, text: &str) -> Value {
    match decode_persisted(kind, text) {
        Ok(value) => value,
        Err(reason) => {
            warn!(%kind, text, %reason, "malformed leaf content, using fallback value");
            fallback(kind)
        }
    }
}

pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text.trim(), DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn format_display_date(date: &DateTime<Utc>) -> String {
    date.with_timezone(&Local)
        .format(DISPLAY_DATE_FORMAT)
        .to_string()
}

/// Parse the on-screen date form. Local times that are skipped or repeated by
/// a daylight-saving transition are rejected as ambiguous.
pub fn parse_display_date(text: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(text.trim(), DISPLAY_DATE_FORMAT).ok()?;
    Local
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
}

pub(crate) fn truncate_to_seconds(date: DateTime<Utc>) -> DateTime<Utc> {
    date.with_nanosecond(0).unwrap_or(date)
}

/// Shortest decimal form that parses back to the same `f64` (`1.0`, `0.5`, `1e21`).
pub fn format_real(real: f64) -> String {
    format!("{real:?}")
}

pub fn parse_real(text: &str) -> Option<f64> {
    text.trim().parse().ok()
}

pub fn encode_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Decode hex text (either case). Odd lengths and non-hex digits are errors.
pub fn decode_hex(text: &str) -> Result<Vec<u8>, String> {
    let digits = text.as_bytes();
    if digits.len() % 2 != 0 {
        return Err("odd number of hex digits".to_string());
    }
    digits
        .chunks(2)
        .enumerate()
        .map(|(i, pair)| {
            let hi = hex_digit(pair[0]);
            let lo = hex_digit(pair[1]);
            match (hi, lo) {
                (Some(hi), Some(lo)) => Ok((hi << 4) | lo),
                _ => Err(format!("illegal hex digit at position {}", i * 2)),
            }
        })
        .collect()
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Single-line base64, as used in JSON exports.
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Base64 wrapped at [`BASE64_LINE_WIDTH`], every line newline-terminated.
/// Empty input yields an empty string.
///
/// Lines end in a bare `\n`, not CRLF. An XML reader turns CRLF into `\n`
/// anyway, so this is the byte sequence a reparse sees and reserialization
/// stays byte-identical.
pub fn encode_base64_wrapped(bytes: &[u8]) -> String {
    let encoded = STANDARD.encode(bytes);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / BASE64_LINE_WIDTH + 1);
    let mut rest = encoded.as_str();
    while !rest.is_empty() {
        let (line, tail) = rest.split_at(rest.len().min(BASE64_LINE_WIDTH));
        out.push_str(line);
        out.push('\n');
        rest = tail;
    }
    out
}

/// Decode base64 text, ignoring whitespace and tolerating missing padding.
pub fn decode_base64(text: &str) -> Result<Vec<u8>, String> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    LENIENT_BASE64
        .decode(compact.as_bytes())
        .map_err(|e| e.to_string())
}
