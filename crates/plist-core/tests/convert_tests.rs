use plist_core::{load, save, serialize, Format, Plist, PlistError, Value};
use std::cell::RefCell;

const XML: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<plist version=\"1.0\"><dict><key>Version</key><integer>1</integer></dict></plist>\n";

/// Helper: a converter that must never be called.
fn no_converter(_: &[u8], target: Format) -> Vec<u8> {
    panic!("unexpected conversion to {target}");
}

/// Helper: a converter that always fails.
fn failing_converter(_: &[u8], _: Format) -> Vec<u8> {
    Vec::new()
}

// ============================================================================
// Load
// ============================================================================

#[test]
fn xml_loads_without_converter() {
    let plist = load(XML, &no_converter).unwrap();
    assert_eq!(plist.format(), Format::Xml);
    assert_eq!(
        plist.root_value(),
        Value::dictionary([("Version", Value::Integer(1))])
    );
}

#[test]
fn binary_is_converted_to_xml_first() {
    let calls = RefCell::new(Vec::new());
    let converter = |bytes: &[u8], target: Format| {
        calls.borrow_mut().push((bytes.to_vec(), target));
        XML.to_vec()
    };
    let plist = load(b"bplist00\x01\x02", &converter).unwrap();

    assert_eq!(plist.format(), Format::LegacyBinary);
    assert_eq!(plist.root_value().get("Version"), Some(&Value::Integer(1)));
    assert_eq!(
        calls.into_inner(),
        vec![(b"bplist00\x01\x02".to_vec(), Format::Xml)]
    );
}

#[test]
fn json_is_converted_to_xml_first() {
    let converter = |_: &[u8], target: Format| {
        assert_eq!(target, Format::Xml);
        XML.to_vec()
    };
    let plist = load(br#"{"Version":1}"#, &converter).unwrap();
    assert_eq!(plist.format(), Format::Json);
}

#[test]
fn failed_conversion_is_an_error() {
    let err = load(b"bplist00", &failing_converter).unwrap_err();
    assert!(matches!(
        err,
        PlistError::Conversion {
            format: Format::Xml,
            ..
        }
    ));
}

#[test]
fn unrecognised_xml_is_parsed_directly() {
    let plist = load(b"<plist><string>x</string></plist>", &no_converter).unwrap();
    assert_eq!(plist.root_value(), Value::from("x"));
    assert_eq!(plist.format(), Format::Xml);
}

#[test]
fn unrecognised_input_falls_back_to_converter() {
    let converter = |_: &[u8], _: Format| XML.to_vec();
    let plist = load(b"not a plist", &converter).unwrap();
    assert_eq!(plist.format(), Format::Other);
    assert_eq!(plist.root_value().get("Version"), Some(&Value::Integer(1)));
}

#[test]
fn unrecognised_input_without_converter_output_fails() {
    assert!(load(b"not a plist", &failing_converter).is_err());
}

// ============================================================================
// Save
// ============================================================================

#[test]
fn xml_saves_without_converter() {
    let plist = Plist::new(Value::Integer(3));
    assert_eq!(save(&plist, &no_converter).unwrap(), serialize(&plist));
}

#[test]
fn other_saves_as_xml() {
    let plist = Plist::with_format(Value::Integer(3), Format::Other);
    assert_eq!(save(&plist, &no_converter).unwrap(), serialize(&plist));
}

#[test]
fn binary_saves_through_converter() {
    let plist = Plist::with_format(Value::Integer(3), Format::LegacyBinary);
    let expected_input = serialize(&plist);
    let converter = move |bytes: &[u8], target: Format| {
        assert_eq!(bytes, expected_input.as_slice());
        assert_eq!(target, Format::LegacyBinary);
        b"bplist00converted".to_vec()
    };
    assert_eq!(save(&plist, &converter).unwrap(), b"bplist00converted".to_vec());
}

#[test]
fn failed_save_conversion_is_an_error() {
    let plist = Plist::with_format(Value::Integer(3), Format::Json);
    let err = save(&plist, &failing_converter).unwrap_err();
    assert_eq!(err.to_string(), "Conversion to json failed: converter returned no data");
}

#[test]
fn load_edit_save_keeps_format() {
    let converter = |bytes: &[u8], target: Format| match target {
        Format::Xml => XML.to_vec(),
        _ => {
            let mut out = b"bplist00".to_vec();
            out.extend_from_slice(bytes);
            out
        }
    };
    let mut plist = load(b"bplist00", &converter).unwrap();
    let version = plist.find("Version").unwrap();
    plist.set_from_string(version, "2").unwrap();
    let saved = save(&plist, &converter).unwrap();
    assert!(saved.starts_with(b"bplist00<?xml"));
    assert!(String::from_utf8_lossy(&saved).contains("<integer>2</integer>"));
}
