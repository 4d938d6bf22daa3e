//! # plist-core
//!
//! Property-list object model with a plist-XML decoder, a canonical XML
//! encoder and an editing API that keeps the model consistent.
//!
//! ## Quick start
//!
//! ```rust
//! use plist_core::{parse, serialize, Value};
//!
//! let xml = br#"<plist version="1.0"><dict>
//!     <key>Name</key><string>Alice</string>
//!     <key>Age</key><integer>30</integer>
//! </dict></plist>"#;
//!
//! let mut plist = parse(xml).unwrap();
//! let dict = plist.root();
//! assert_eq!(plist.root_value().get("Age"), Some(&Value::Integer(30)));
//!
//! // Edit in place, then write canonical XML.
//! let new_child = plist.insert_first_child(dict, Value::Boolean(true)).unwrap();
//! assert_eq!(plist.key_of(new_child), Some("New Item"));
//! let bytes = serialize(&plist);
//! assert!(bytes.starts_with(b"<?xml"));
//! ```
//!
//! ## Modules
//!
//! - [`types`]: the owned value model (`Value`, `ValueType`, `Entry`)
//! - [`document`]: `Plist` arena, `NodeId` handles and the mutation API
//! - [`decoder`]: plist-XML bytes → `Plist`
//! - [`encoder`]: `Plist` → plist-XML bytes
//! - [`format`]: storage formats and the prefix-sniffing probe
//! - [`codec`]: text codecs for primitives and the lenient fallback table
//! - [`convert`]: load/save through an external format converter
//! - [`error`]: error types

pub mod codec;
pub mod convert;
pub mod decoder;
pub mod document;
pub mod encoder;
pub mod error;
pub mod format;
pub mod types;

pub use convert::{load, save, Converter};
pub use decoder::{parse, XmlHandler};
pub use document::{Container, NodeId, Plist};
pub use encoder::{serialize, to_xml_string};
pub use error::PlistError;
pub use format::{detect_format, Format};
pub use types::{Entry, Value, ValueType};
