//! The plist value model.
//!
//! [`Value`] is a closed sum type over the eight property-list kinds. It is an
//! owned tree used to build documents programmatically and to snapshot them
//! back out; equality and hashing are structural. Editing with node identity
//! happens on [`crate::Plist`], which stores the same values in an arena.
//!
//! Reals compare by bit pattern, so `0.0 != -0.0`, and every NaN is first
//! folded to one canonical NaN, so `NaN == NaN` whatever its sign or payload.
//! This keeps `Eq` and `Hash` lawful for every value, including nested ones,
//! and matches what survives XML, which spells every NaN as `NaN`.

use crate::codec;
use crate::error::{PlistError, Result};
use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Stable type tag for a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueType {
    Array,
    Boolean,
    Data,
    Date,
    Dictionary,
    Integer,
    Real,
    String,
}

impl ValueType {
    /// Every kind, in the order editors list them in type pickers.
    pub const ALL: [ValueType; 8] = [
        ValueType::Array,
        ValueType::Boolean,
        ValueType::Data,
        ValueType::Date,
        ValueType::Dictionary,
        ValueType::Integer,
        ValueType::Real,
        ValueType::String,
    ];

    pub fn is_aggregate(self) -> bool {
        matches!(self, ValueType::Array | ValueType::Dictionary)
    }

    /// A fresh value of this kind, as created when a user adds a new node.
    ///
    /// Dates default to the current instant truncated to whole seconds, the
    /// finest resolution the XML encoding keeps.
    pub fn default_value(self) -> Value {
        match self {
            ValueType::Array => Value::Array(Vec::new()),
            ValueType::Boolean => Value::Boolean(false),
            ValueType::Data => Value::Data(Vec::new()),
            ValueType::Date => Value::Date(codec::truncate_to_seconds(Utc::now())),
            ValueType::Dictionary => Value::Dictionary(Vec::new()),
            ValueType::Integer => Value::Integer(0),
            ValueType::Real => Value::Real(0.0),
            ValueType::String => Value::String(String::new()),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Array => "Array",
            ValueType::Boolean => "Boolean",
            ValueType::Data => "Data",
            ValueType::Date => "Date",
            ValueType::Dictionary => "Dictionary",
            ValueType::Integer => "Integer",
            ValueType::Real => "Real",
            ValueType::String => "String",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A property-list value: one of two aggregates or six primitives.
///
/// Array elements are anonymous. Dictionary entries keep their insertion
/// order, which is visible both when browsing and in the serialized XML.
#[derive(Debug, Clone)]
pub enum Value {
    Array(Vec<Value>),
    Dictionary(Vec<(String, Value)>),
    Boolean(bool),
    Data(Vec<u8>),
    Date(DateTime<Utc>),
    Integer(i32),
    Real(f64),
    String(String),
}

impl Value {
    /// Build a dictionary from `(key, value)` pairs, keeping their order.
    pub fn dictionary<K, I>(entries: I) -> Value
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Dictionary(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn array<I: IntoIterator<Item = Value>>(items: I) -> Value {
        Value::Array(items.into_iter().collect())
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Array(_) => ValueType::Array,
            Value::Dictionary(_) => ValueType::Dictionary,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Data(_) => ValueType::Data,
            Value::Date(_) => ValueType::Date,
            Value::Integer(_) => ValueType::Integer,
            Value::Real(_) => ValueType::Real,
            Value::String(_) => ValueType::String,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        self.value_type().is_aggregate()
    }

    /// Number of direct children, or `None` for primitives.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Array(items) => Some(items.len()),
            Value::Dictionary(entries) => Some(entries.len()),
            _ => None,
        }
    }

    /// Look up a dictionary entry by key. Returns the first match.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Dictionary(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Human-readable form used by editors.
    ///
    /// Aggregates report their size (`"(1 item)"`, `"(3 items)"`), data is
    /// lowercase hex and dates use the local medium date/time style. None of
    /// these are the persisted XML forms.
    pub fn as_string(&self) -> String {
        match self {
            Value::Array(items) => item_count(items.len()),
            Value::Dictionary(entries) => item_count(entries.len()),
            Value::Boolean(b) => b.to_string(),
            Value::Data(bytes) => codec::encode_hex(bytes),
            Value::Date(date) => codec::format_display_date(date),
            Value::Integer(n) => n.to_string(),
            Value::Real(r) => codec::format_real(*r),
            Value::String(s) => s.clone(),
        }
    }

    /// Replace a primitive's content by parsing `text` in its editing form.
    ///
    /// On failure the previous content is kept and an
    /// [`PlistError::InvalidValue`] describing the problem is returned.
    pub fn set_from_string(&mut self, text: &str) -> Result<()> {
        match self {
            Value::Array(_) => return Err(PlistError::NotPrimitive(ValueType::Array)),
            Value::Dictionary(_) => return Err(PlistError::NotPrimitive(ValueType::Dictionary)),
            Value::Boolean(b) => {
                *b = text
                    .trim()
                    .parse()
                    .map_err(|_| PlistError::invalid(ValueType::Boolean, format!("'{text}'")))?;
            }
            Value::Data(bytes) => {
                *bytes = codec::decode_hex(text)
                    .map_err(|message| PlistError::invalid(ValueType::Data, message))?;
            }
            Value::Date(date) => {
                *date = codec::parse_display_date(text)
                    .ok_or_else(|| PlistError::invalid(ValueType::Date, format!("'{text}'")))?;
            }
            Value::Integer(n) => {
                *n = text
                    .parse()
                    .map_err(|e| PlistError::invalid(ValueType::Integer, format!("'{text}': {e}")))?;
            }
            Value::Real(r) => {
                *r = codec::parse_real(text)
                    .ok_or_else(|| PlistError::invalid(ValueType::Real, format!("'{text}'")))?;
            }
            Value::String(s) => {
                text.clone_into(s);
            }
        }
        Ok(())
    }

    /// Render this value as JSON, e.g. for `show --json`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

pub(crate) fn item_count(count: usize) -> String {
    if count == 1 {
        "(1 item)".to_string()
    } else {
        format!("({count} items)")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Dictionary(a), Value::Dictionary(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Data(a), Value::Data(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => real_bits(*a) == real_bits(*b),
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value_type().hash(state);
        match self {
            Value::Array(items) => items.hash(state),
            Value::Dictionary(entries) => entries.hash(state),
            Value::Boolean(b) => b.hash(state),
            Value::Data(bytes) => bytes.hash(state),
            Value::Date(date) => date.hash(state),
            Value::Integer(n) => n.hash(state),
            Value::Real(r) => real_bits(*r).hash(state),
            Value::String(s) => s.hash(state),
        }
    }
}

fn real_bits(real: f64) -> u64 {
    if real.is_nan() {
        f64::NAN.to_bits()
    } else {
        real.to_bits()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Value::Real(r)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Data(bytes)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(date: DateTime<Utc>) -> Self {
        Value::Date(date)
    }
}

/// JSON view of a value: data becomes a base64 string and dates use the
/// persisted `yyyy-MM-ddTHH:mm:ssZ` form.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Dictionary(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Data(bytes) => serializer.serialize_str(&codec::encode_base64(bytes)),
            Value::Date(date) => serializer.serialize_str(&codec::format_date(date)),
            Value::Integer(n) => serializer.serialize_i32(*n),
            Value::Real(r) => serializer.serialize_f64(*r),
            Value::String(s) => serializer.serialize_str(s),
        }
    }
}

/// An immutable `(name, value)` pair held by an aggregate.
///
/// Dictionary entries always carry a name; array entries carry none when
/// appended and a synthesized `"Item <n>"` label when listed. The value type
/// defaults to [`Value`]; document listings use `Entry<NodeId>` instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entry<V = Value> {
    name: Option<String>,
    value: V,
}

impl<V> Entry<V> {
    pub fn new(name: Option<String>, value: V) -> Self {
        Self { name, value }
    }

    pub fn named(name: impl Into<String>, value: V) -> Self {
        Self::new(Some(name.into()), value)
    }

    pub fn anonymous(value: V) -> Self {
        Self::new(None, value)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn into_parts(self) -> (Option<String>, V) {
        (self.name, self.value)
    }
}

impl<V: fmt::Display> fmt::Display for Entry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} -> {}", self.value),
            None => write!(f, "{}", self.value),
        }
    }
}
