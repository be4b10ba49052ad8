use std::io::Write;
use std::process::Command;

use tempfile::NamedTempFile;

fn spinc() -> Command {
    Command::new(env!("CARGO_BIN_EXE_spinc"))
}

fn source_file(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(text.as_bytes()).expect("write source");
    file
}

const SYMBOLS: &str = r#"{"locals": {"a": 0, "b": 4}, "constants": {"LIMIT": 10}}"#;

#[test]
fn hex_dump_of_a_method_body() {
    let src = source_file("b := a + LIMIT\n");
    let syms = source_file(SYMBOLS);
    let out = spinc()
        .arg(src.path())
        .arg("--symbols")
        .arg(syms.path())
        .output()
        .expect("failed to run spinc");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "00000- E0 AB 8A F1");
}

#[test]
fn json_output_with_con_lines() {
    let src = source_file("HALF = LIMIT / 2\nTWICE = HALF * 4\nb := TWICE\n");
    let syms = source_file(SYMBOLS);
    let out = spinc()
        .arg(src.path())
        .args(["--format", "json", "--symbols"])
        .arg(syms.path())
        .output()
        .expect("failed to run spinc");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("JSON output");
    assert_eq!(v["length"], 3);
    assert_eq!(v["bytes"], serde_json::json!([0x42, 20, 0xF1]));
}

#[test]
fn undefined_symbol_exits_with_diagnostic() {
    let src = source_file("b := missing + 1\n");
    let syms = source_file(SYMBOLS);
    let out = spinc()
        .arg(src.path())
        .arg("--symbols")
        .arg(syms.path())
        .output()
        .expect("failed to run spinc");
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("SPN-S003"), "stderr: {stderr}");
    assert!(stderr.contains("missing"), "stderr: {stderr}");
    assert!(stderr.contains("--> 1:6"), "stderr: {stderr}");
}

#[test]
fn json_diagnostics_on_stderr() {
    let src = source_file("b := 1 / 0\n");
    let syms = source_file(SYMBOLS);
    let out = spinc()
        .arg(src.path())
        .args(["--format", "json", "--symbols"])
        .arg(syms.path())
        .output()
        .expect("failed to run spinc");
    assert_eq!(out.status.code(), Some(1));
    let v: serde_json::Value = serde_json::from_slice(&out.stderr).expect("JSON diagnostic");
    assert_eq!(v["code"], "SPN-T003");
    assert_eq!(v["labels"][0]["line"], 1);
}

#[test]
fn config_file_tightens_limits() {
    let src = source_file("repeat\n  repeat\n    b := 1\n");
    let syms = source_file(SYMBOLS);
    let config = source_file(r#"{"block_nest_limit": 1}"#);
    let out = spinc()
        .arg(src.path())
        .arg("--symbols")
        .arg(syms.path())
        .arg("--config")
        .arg(config.path())
        .output()
        .expect("failed to run spinc");
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("SPN-K005"));
}

#[test]
fn unknown_config_key_is_rejected() {
    let src = source_file("b := 1\n");
    let config = source_file(r#"{"nest": 1}"#);
    let out = spinc()
        .arg(src.path())
        .arg("--config")
        .arg(config.path())
        .output()
        .expect("failed to run spinc");
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Invalid config file"));
}

#[test]
fn explain_prints_registry_text() {
    let out = spinc().args(["--explain", "spn-k003"]).output().expect("failed to run spinc");
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("## SPN-K003"));
}

#[test]
fn missing_file_is_reported() {
    let out = spinc().arg("/nonexistent/method.spin2").output().expect("failed to run spinc");
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Error reading"));
}
