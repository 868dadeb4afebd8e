use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn infers_schema_from_stdin() {
    Command::cargo_bin("moxpopuli-cli")
        .unwrap()
        .write_stdin(r#"{"name": "alice", "age": 30}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"type\": \"object\""));
}

#[test]
fn infers_schema_from_ndjson_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"id": 1}}"#).unwrap();
    writeln!(file, r#"{{"id": 2}}"#).unwrap();

    Command::cargo_bin("moxpopuli-cli")
        .unwrap()
        .arg("--ndjson")
        .arg(file.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Processed 2 JSON payload(s)"));
}

#[test]
fn rejects_malformed_json() {
    Command::cargo_bin("moxpopuli-cli")
        .unwrap()
        .write_stdin("{not json}")
        .assert()
        .failure();
}

#[test]
fn help_flag_prints_usage() {
    Command::cargo_bin("moxpopuli-cli")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("USAGE"));
}
