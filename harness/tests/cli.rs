//! CLI tests for the `harness` binary.
//!
//! Spawns the binary against a stub scanner and checks exit codes and echoed
//! output.

#![cfg(unix)]

use std::process::Command;

use harness::exit_codes;
use harness::test_support::StubBinary;

#[test]
fn plugins_exits_with_scanner_status_and_echoes_output() {
    let temp = tempfile::tempdir().expect("tempdir");
    let stub = StubBinary::printing(&["plugin-a", "plugin-b"], 7).expect("stub");

    let output = Command::new(env!("CARGO_BIN_EXE_harness"))
        .current_dir(temp.path())
        .arg("--binary")
        .arg(stub.path())
        .args(["plugins", "--signatures", "sigs.yml"])
        .output()
        .expect("harness plugins");

    assert_eq!(output.status.code(), Some(7));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "plugin-a\nplugin-b\nReturn code 7\n"
    );
}

#[test]
fn quiet_suppresses_echo() {
    let temp = tempfile::tempdir().expect("tempdir");
    let stub = StubBinary::echo_args().expect("stub");

    let output = Command::new(env!("CARGO_BIN_EXE_harness"))
        .current_dir(temp.path())
        .arg("--quiet")
        .arg("--binary")
        .arg(stub.path())
        .args(["scan", "--signatures", "sigs.yml", "http://localhost:8000"])
        .output()
        .expect("harness scan");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(output.stdout.is_empty());
}

#[test]
fn config_file_selects_binary() {
    let temp = tempfile::tempdir().expect("tempdir");
    let stub = StubBinary::printing(&["from config"], 0).expect("stub");
    let config = temp.path().join("harness.toml");
    std::fs::write(
        &config,
        format!("binary_path = {:?}\n", stub.path().display().to_string()),
    )
    .expect("write config");

    let output = Command::new(env!("CARGO_BIN_EXE_harness"))
        .current_dir(temp.path())
        .args(["scan-url-file", "--signatures", "s.yml", "--url-file", "urls.txt"])
        .output()
        .expect("harness scan-url-file");

    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("from config\n"));
}

#[test]
fn missing_scanner_exits_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");

    let status = Command::new(env!("CARGO_BIN_EXE_harness"))
        .current_dir(temp.path())
        .args(["plugins", "--signatures", "sigs.yml"])
        .status()
        .expect("harness plugins");

    assert_eq!(status.code(), Some(exit_codes::INVALID));
}
