//! Load/save pipeline around an external format converter.
//!
//! Only plist-XML is understood natively. Binary and JSON plists are handed to
//! a [`Converter`] (in practice the OS `plutil` tool) on the way in and out:
//!
//! ```text
//! bytes → detect_format → [convert to XML] → parse → Plist
//! Plist → serialize → [convert to stored format] → bytes
//! ```

use crate::decoder::parse;
use crate::document::Plist;
use crate::encoder::serialize;
use crate::error::{PlistError, Result};
use crate::format::{detect_format, Format};
use std::borrow::Cow;
use tracing::{debug, warn};

/// Converts plist bytes into another encoding.
///
/// An empty result signals failure; implementations report the cause
/// themselves (e.g. through `tracing`) instead of panicking.
pub trait Converter {
    fn convert(&self, bytes: &[u8], target: Format) -> Vec<u8>;
}

impl<F> Converter for F
where
    F: Fn(&[u8], Format) -> Vec<u8>,
{
    fn convert(&self, bytes: &[u8], target: Format) -> Vec<u8> {
        self(bytes, target)
    }
}

/// Read a plist in any supported encoding.
///
/// XML is parsed directly. Binary and JSON input is converted to XML first.
/// Unrecognised input is tried as XML before falling back to the converter.
/// The detected format is recorded on the returned document.
pub fn load(bytes: &[u8], converter: &dyn Converter) -> Result<Plist> {
    let format = detect_format(bytes);
    debug!(%format, bytes = bytes.len(), "loading plist");

    let xml: Cow<'_, [u8]> = match format {
        Format::Xml => Cow::Borrowed(bytes),
        Format::Other => match parse(bytes) {
            Ok(mut plist) => {
                plist.set_format(Format::Xml);
                return Ok(plist);
            }
            Err(e) => {
                debug!(error = %e, "input is not plain plist-XML, trying the converter");
                Cow::Owned(to_format(bytes, Format::Xml, converter)?)
            }
        },
        Format::LegacyBinary | Format::Json => Cow::Owned(to_format(bytes, Format::Xml, converter)?),
    };

    let mut plist = parse(&xml)?;
    plist.set_format(format);
    Ok(plist)
}

/// Write a plist in the format recorded on it.
///
/// Documents tagged `Xml` or `Other` are written as XML without calling the
/// converter.
pub fn save(plist: &Plist, converter: &dyn Converter) -> Result<Vec<u8>> {
    let xml = serialize(plist);
    match plist.format() {
        Format::Xml | Format::Other => Ok(xml),
        target => to_format(&xml, target, converter),
    }
}

fn to_format(bytes: &[u8], target: Format, converter: &dyn Converter) -> Result<Vec<u8>> {
    let converted = converter.convert(bytes, target);
    if converted.is_empty() {
        warn!(%target, "external conversion produced no output");
        return Err(PlistError::Conversion {
            format: target,
            message: "converter returned no data".to_string(),
        });
    }
    debug!(%target, bytes = converted.len(), "converted plist");
    Ok(converted)
}
