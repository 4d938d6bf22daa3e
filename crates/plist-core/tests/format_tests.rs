use plist_core::{detect_format, Format};

// ============================================================================
// Probe
// ============================================================================

#[test]
fn xml_header_is_xml() {
    let bytes = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<plist version=\"1.0\"><true/></plist>";
    assert_eq!(detect_format(bytes), Format::Xml);
}

#[test]
fn binary_magic_is_legacy_binary() {
    let mut bytes = b"bplist00".to_vec();
    bytes.extend_from_slice(&[0xd4, 0x01, 0x02, 0xff, 0xfe, 0x80]);
    assert_eq!(detect_format(&bytes), Format::LegacyBinary);
}

#[test]
fn json_object_and_array() {
    assert_eq!(detect_format(br#"{"key": 1}"#), Format::Json);
    assert_eq!(detect_format(b"[1, 2]"), Format::Json);
    assert_eq!(detect_format(b"[]"), Format::Json);
}

#[test]
fn object_without_quoted_key_is_other() {
    assert_eq!(detect_format(b"{}"), Format::Other);
    assert_eq!(detect_format(b"{ \"key\": 1 }"), Format::Other);
}

#[test]
fn anything_else_is_other() {
    assert_eq!(detect_format(b""), Format::Other);
    assert_eq!(detect_format(b"<plist><true/></plist>"), Format::Other);
    assert_eq!(
        detect_format(b"  <?xml version=\"1.0\" encoding=\"UTF-8\"?>"),
        Format::Other
    );
    assert_eq!(
        detect_format(b"<?xml version='1.0' encoding='UTF-8'?>"),
        Format::Other
    );
    assert_eq!(detect_format(&[0xff, 0xfe, 0x00]), Format::Other);
}

#[test]
fn probe_only_reads_the_prefix() {
    let mut bytes = b"bplist00".to_vec();
    bytes.extend(std::iter::repeat(0xffu8).take(10_000));
    assert_eq!(detect_format(&bytes), Format::LegacyBinary);
}

// ============================================================================
// Names
// ============================================================================

#[test]
fn external_tool_names() {
    assert_eq!(Format::Xml.external_name(), "xml1");
    assert_eq!(Format::LegacyBinary.external_name(), "binary1");
    assert_eq!(Format::Json.external_name(), "json");
    assert_eq!(Format::Other.external_name(), "xml1");
}

#[test]
fn parse_format_names() {
    assert_eq!("xml".parse::<Format>(), Ok(Format::Xml));
    assert_eq!("XML1".parse::<Format>(), Ok(Format::Xml));
    assert_eq!("binary1".parse::<Format>(), Ok(Format::LegacyBinary));
    assert_eq!("json".parse::<Format>(), Ok(Format::Json));
    assert!("yaml".parse::<Format>().is_err());
}

#[test]
fn display_and_serde_names_agree() {
    for format in [Format::Xml, Format::LegacyBinary, Format::Json, Format::Other] {
        let json = serde_json::to_string(&format).unwrap();
        assert_eq!(json, format!("\"{format}\""));
        let back: Format = serde_json::from_str(&json).unwrap();
        assert_eq!(back, format);
    }
}

#[test]
fn default_format_is_xml() {
    assert_eq!(Format::default(), Format::Xml);
}
