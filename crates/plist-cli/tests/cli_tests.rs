//! Integration tests for the `plist` CLI binary.
//!
//! These tests use `assert_cmd` and `predicates` to exercise every subcommand
//! through the actual binary, including stdin/stdout piping, file I/O, error
//! handling and log verbosity. No test depends on a real `plutil`: the
//! converter is pointed at a program that does not exist, which XML input never
//! needs and binary/JSON conversion reports as an error.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;

const MISSING_PLUTIL: &str = "/nonexistent/plutil";

/// Helper: path to the sample.plist fixture.
fn sample_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/sample.plist")
}

/// Helper: the binary with a converter that can never run.
fn plist() -> Command {
    let mut cmd = Command::cargo_bin("plist").unwrap();
    cmd.env("PLIST_PLUTIL", MISSING_PLUTIL);
    cmd
}

// ─────────────────────────────────────────────────────────────────────────────
// probe
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn probe_xml_file() {
    plist()
        .args(["probe", "-i", sample_path()])
        .assert()
        .success()
        .stdout("xml\n");
}

#[test]
fn probe_binary_stdin() {
    plist()
        .arg("probe")
        .write_stdin(b"bplist00\xd4\x01\x02".to_vec())
        .assert()
        .success()
        .stdout("binary\n");
}

#[test]
fn probe_json_and_other() {
    plist()
        .arg("probe")
        .write_stdin(r#"{"a":1}"#)
        .assert()
        .success()
        .stdout("json\n");
    plist()
        .arg("probe")
        .write_stdin("hello")
        .assert()
        .success()
        .stdout("other\n");
}

// ─────────────────────────────────────────────────────────────────────────────
// show / get
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn show_prints_indented_tree() {
    let expected = "<plist>  Dictionary  (3 items)
  Installed Extensions  Array  (1 item)
    Item 0  Dictionary  (2 items)
      Archive File Name  String  YouTube5.safariextz
      Enabled  Boolean  true
  Version  Integer  1
  Checksum  Data  3c4281a581a59981423c
";
    plist()
        .args(["show", "-i", sample_path()])
        .assert()
        .success()
        .stdout(expected);
}

#[test]
fn show_json() {
    plist()
        .args(["show", "--json", "-i", sample_path()])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""Version": 1"#))
        .stdout(predicate::str::contains(r#""Checksum": "PEKBpYGlmYFCPA==""#))
        .stdout(predicate::str::contains(r#""Enabled": true"#));
}

#[test]
fn get_by_path() {
    plist()
        .args(["get", "Version", "-i", sample_path()])
        .assert()
        .success()
        .stdout("1\n");
    plist()
        .args(["get", "Installed Extensions/0/Enabled", "-i", sample_path()])
        .assert()
        .success()
        .stdout("true\n");
    plist()
        .args(["get", "Installed Extensions", "-i", sample_path()])
        .assert()
        .success()
        .stdout("(1 item)\n");
}

#[test]
fn get_json_subtree() {
    plist()
        .args(["get", "--json", "Installed Extensions/0", "-i", sample_path()])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""Archive File Name": "YouTube5.safariextz""#));
}

#[test]
fn get_missing_path_fails() {
    plist()
        .args(["get", "Nope", "-i", sample_path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No value at path 'Nope'"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Editing
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn set_writes_xml_to_stdout() {
    plist()
        .args(["set", "Version", "2", "-i", sample_path()])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("<?xml"))
        .stdout(predicate::str::contains("<key>Version</key>\n<integer>2</integer>\n"));
}

#[test]
fn set_invalid_text_fails() {
    plist()
        .args(["set", "Version", "two", "-i", sample_path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot parse Integer"));
}

#[test]
fn set_on_aggregate_fails() {
    plist()
        .args(["set", "Installed Extensions", "x", "-i", sample_path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be edited as text"));
}

#[test]
fn set_data_from_hex() {
    plist()
        .args(["set", "Checksum", "68690a", "-i", sample_path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("<data>\naGkK\n</data>\n"));
}

#[test]
fn rename_key() {
    plist()
        .args(["rename", "Version", "Build", "-i", sample_path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("<key>Build</key>\n<integer>1</integer>\n"))
        .stdout(predicate::str::contains("<key>Version</key>").not());
}

#[test]
fn rename_to_taken_name_fails() {
    plist()
        .args(["rename", "Version", "Checksum", "-i", sample_path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already in use"));
}

#[test]
fn rename_array_item_fails() {
    plist()
        .args(["rename", "Installed Extensions/0", "First", "-i", sample_path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a dictionary entry"));
}

#[test]
fn delete_array_item() {
    plist()
        .args(["delete", "Installed Extensions/0", "-i", sample_path()])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "<key>Installed Extensions</key>\n<array>\n</array>\n",
        ));
}

#[test]
fn delete_root_fails() {
    plist()
        .args(["delete", "", "-i", sample_path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("root value cannot be removed"));
}

#[test]
fn add_default_value_to_dictionary() {
    plist()
        .args(["add", "", "--type", "boolean", "-i", sample_path()])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "<dict>\n<key>New Item</key>\n<false/>\n<key>Installed Extensions</key>",
        ));
}

#[test]
fn add_with_initial_value_to_array() {
    plist()
        .args([
            "add",
            "Installed Extensions",
            "--type",
            "integer",
            "--value",
            "7",
            "-i",
            sample_path(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("<array>\n<integer>7</integer>\n<dict>\n"));
}

#[test]
fn add_to_primitive_fails() {
    plist()
        .args(["add", "Version", "--type", "string", "-i", sample_path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not an array or dictionary"));
}

#[test]
fn edit_from_stdin() {
    plist()
        .args(["set", "", "hello"])
        .write_stdin("<plist><string>bye</string></plist>")
        .assert()
        .success()
        .stdout(predicate::str::contains("<string>hello</string>"));
}

// ─────────────────────────────────────────────────────────────────────────────
// convert / file output
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn convert_to_xml_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.plist");
    plist()
        .args(["convert", "-i", sample_path(), "-o", out.to_str().unwrap()])
        .assert()
        .success()
        .stdout("");
    let written = std::fs::read_to_string(&out).unwrap();
    assert!(written.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE plist"));
    assert!(written.contains("<data>\nPEKBpYGlmYFCPA==\n</data>\n"));
    assert!(written.ends_with("</plist>\n"));
}

#[test]
fn edit_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("edit.plist");
    std::fs::copy(sample_path(), &path).unwrap();
    let path = path.to_str().unwrap();

    plist()
        .args(["set", "Version", "5", "-i", path, "-o", path])
        .assert()
        .success();
    plist()
        .args(["get", "Version", "-i", path])
        .assert()
        .success()
        .stdout("5\n");
}

#[test]
fn convert_to_binary_without_plutil_fails() {
    plist()
        .args(["convert", "--to", "binary", "-i", sample_path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Conversion to binary failed"));
}

#[test]
fn loading_json_without_plutil_fails() {
    plist()
        .arg("show")
        .write_stdin(r#"{"a":1}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Conversion to xml failed"));
}

#[test]
fn missing_input_file_fails() {
    plist()
        .args(["show", "-i", "/nonexistent/file.plist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}

#[test]
fn malformed_xml_fails() {
    plist()
        .arg("show")
        .write_stdin("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<plist><dict>")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot parse xml"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

const MALFORMED_LEAF: &str = "<plist><integer>abc</integer></plist>";

#[test]
fn lenient_leaf_is_logged_by_default() {
    plist()
        .args(["get", ""])
        .write_stdin(MALFORMED_LEAF)
        .assert()
        .success()
        .stdout("0\n")
        .stderr(predicate::str::contains("malformed leaf content"));
}

#[test]
fn quiet_silences_logs() {
    plist()
        .args(["-q", "get", ""])
        .write_stdin(MALFORMED_LEAF)
        .assert()
        .success()
        .stdout("0\n")
        .stderr("");
}

#[test]
fn verbose_shows_debug_logs() {
    plist()
        .args(["-vv", "get", "Version", "-i", sample_path()])
        .assert()
        .success()
        .stdout("1\n")
        .stderr(predicate::str::contains("parsed plist document"));
}

#[test]
fn help_lists_subcommands() {
    plist()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("probe"))
        .stdout(predicate::str::contains("convert"))
        .stdout(predicate::str::contains("rename"));
}
