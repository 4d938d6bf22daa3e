//! Error types for plist parsing, editing and conversion.

use crate::format::Format;
use crate::types::ValueType;
use thiserror::Error;

/// Errors that can occur while reading, editing or writing a property list.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlistError {
    /// The input was not well-formed XML (or not UTF-8 at all).
    /// Raised once per parse; no partial document is returned.
    #[error("Cannot parse xml: {message}")]
    Xml { message: String },

    /// Well-formed XML that never produced a top-level value.
    #[error("Cannot parse xml: document contains no plist value")]
    EmptyDocument,

    /// A second top-level value appeared after the root value was complete.
    #[error("Cannot parse xml: unexpected <{tag}> after the root value")]
    UnexpectedValue { tag: String },

    /// Text could not be interpreted as a value of the given kind.
    #[error("Cannot parse {kind}: {message}")]
    InvalidValue { kind: ValueType, message: String },

    /// Text editing was attempted on an array or dictionary.
    #[error("{0} values cannot be edited as text")]
    NotPrimitive(ValueType),

    /// The node handle does not belong to a live node of this document.
    #[error("unknown node handle")]
    UnknownNode,

    /// The external converter reported a failure.
    #[error("Conversion to {format} failed: {message}")]
    Conversion { format: Format, message: String },
}

impl PlistError {
    pub(crate) fn invalid(kind: ValueType, message: impl Into<String>) -> Self {
        PlistError::InvalidValue {
            kind,
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout plist-core.
pub type Result<T> = std::result::Result<T, PlistError>;
