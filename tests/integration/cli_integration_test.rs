//! Integration tests for the flowctx CLI
//!
//! These tests spawn the actual binary and check its JSON output.

use serde_json::Value;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

fn get_binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_flowctx"))
}

fn run(args: &[&str]) -> Output {
    Command::new(get_binary_path())
        .args(args)
        .env_remove("FLOWCTX_CONFIG")
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to execute flowctx")
}

fn stdout_json(output: &Output) -> Value {
    let stdout = String::from_utf8(output.stdout.clone()).unwrap();
    serde_json::from_str(&stdout).expect("stdout should be JSON")
}

#[test]
fn test_cli_help() {
    let output = run(&["--help"]);
    assert!(output.status.success(), "Help command should succeed");
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("simulate"), "Should show simulate subcommand");
    assert!(stdout.contains("check-config"), "Should show check-config subcommand");
}

#[test]
fn test_simulate_propagates_inbound_correlation_id() {
    let output = run(&[
        "simulate",
        "-H",
        "x-ms-request-root-id=corr-cli",
        "-H",
        "x-ms-request-id=req-cli",
        "--field",
        "tenant=contoso",
        "--field",
        "attempt=2",
        "--outbound",
        "http://orders.local/api",
        "--outbound",
        "https://acct.blob.core.windows.net/container",
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let report = stdout_json(&output);
    assert_eq!(report["context"]["correlationId"], "corr-cli");
    assert_eq!(report["context"]["requestId"], "req-cli");
    assert_eq!(report["context"]["tenant"], "contoso");
    assert_eq!(report["context"]["attempt"], 2);

    let calls = report["outbound"].as_array().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0]["headers"]["x-ms-request-root-id"], "corr-cli");
    assert!(calls[0]["headers"]["x-ms-request-id"].is_string());
    // Excluded by the default endpoint filter.
    assert!(calls[1]["headers"].as_object().unwrap().is_empty());
}

#[test]
fn test_simulate_generates_ids_and_uses_trace_id() {
    let output = run(&["simulate", "--trace-id", "host-42"]);
    assert!(output.status.success());

    let report = stdout_json(&output);
    assert_eq!(report["context"]["requestId"], "host-42");
    assert!(!report["context"]["correlationId"].as_str().unwrap().is_empty());
}

#[test]
fn test_config_file_changes_header_names() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("correlation.json");
    std::fs::write(
        &config,
        r#"{
            "InstrumentIncomingRequests": "true",
            "Headers": { "CorrelationIdHeaderName": "X-Corr", "RequestIdHeaderName": "X-Req" },
            "EndpointFilter": { "Allow": true, "Endpoints": ["allowed\\.local"] }
        }"#,
    )
    .unwrap();
    let config = config.to_str().unwrap();

    let output = run(&["--config", config, "check-config"]);
    assert!(output.status.success());
    let effective = stdout_json(&output);
    assert_eq!(effective["Headers"]["CorrelationIdHeaderName"], "x-corr");
    assert_eq!(effective["EndpointFilter"]["Allow"], true);

    let output = run(&[
        "--config",
        config,
        "simulate",
        "-H",
        "x-corr=corr-custom",
        "-o",
        "http://allowed.local/x",
        "-o",
        "http://other.local/x",
    ]);
    assert!(output.status.success());
    let report = stdout_json(&output);
    let calls = report["outbound"].as_array().unwrap();
    assert_eq!(calls[0]["headers"]["x-corr"], "corr-custom");
    assert!(calls[0]["headers"]["x-req"].is_string());
    assert!(calls[1]["headers"].as_object().unwrap().is_empty());
}

#[test]
fn test_invalid_config_fails() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("bad.json");
    std::fs::write(&config, r#"{"InstrumentOutgoingRequests": "sometimes"}"#).unwrap();

    let output = run(&["--config", config.to_str().unwrap(), "check-config"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("InstrumentOutgoingRequests"), "stderr: {}", stderr);
}

#[test]
fn test_malformed_header_argument_fails() {
    let output = run(&["simulate", "-H", "no-equals-sign"]);
    assert!(!output.status.success());
}
