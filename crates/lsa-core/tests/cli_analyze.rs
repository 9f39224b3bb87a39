//! CLI tests for the `lsa` binary.
//!
//! Exercises the analyze command end to end through real files and
//! verifies argument errors map to the documented exit codes.

use assert_cmd::Command;
use predicates::prelude::*;
use std::collections::BTreeMap;
use std::path::PathBuf;

use lsa_core::actions::Action;
use lsa_core::dataset::{Dataset, Document};
use lsa_core::stream::{decode_gzip_ndjson, decode_ndjson};

fn lsa() -> Command {
    Command::cargo_bin("lsa").expect("lsa binary should exist")
}

fn doc(ts_ms: i64, pairs: &[(&str, &str)]) -> Document {
    Document {
        ts_ms,
        fields: pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
    }
}

fn write_spike_dataset(dir: &tempfile::TempDir) -> PathBuf {
    let mut docs = Vec::new();
    for i in 0..200 {
        docs.push(doc(i * 5, &[("service", "api")]));
    }
    for i in 0..200 {
        docs.push(doc(1000 + i * 5, &[("service", "api")]));
    }
    for i in 0..300 {
        docs.push(doc(1000 + i * 3, &[("service", "checkout")]));
    }
    let path = dir.path().join("dataset.json");
    std::fs::write(&path, serde_json::to_string(&Dataset::new(docs)).unwrap()).unwrap();
    path
}

fn write_request(dir: &tempfile::TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("request.json");
    std::fs::write(&path, body).unwrap();
    path
}

const PLAIN_REQUEST: &str = r#"{
    "baseline": {"startMs": 0, "endMs": 1000},
    "deviation": {"startMs": 1000, "endMs": 2000},
    "compressResponse": false
}"#;

// ============================================================================
// Analyze
// ============================================================================

#[test]
fn analyze_streams_actions_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_spike_dataset(&dir);
    let request = write_request(&dir, PLAIN_REQUEST);

    let output = lsa()
        .arg("analyze")
        .arg("--dataset")
        .arg(&dataset)
        .arg("--request")
        .arg(&request)
        .output()
        .unwrap();
    assert!(output.status.success());

    let actions = decode_ndjson(&output.stdout).unwrap();
    assert_eq!(actions[0], Action::Reset);
    let found: Vec<String> = actions
        .iter()
        .filter_map(|a| match a {
            Action::AddSignificantTerms(terms) => Some(terms.iter().map(|t| t.key())),
            _ => None,
        })
        .flatten()
        .collect();
    assert!(found.contains(&"service:checkout".to_string()));
}

#[test]
fn analyze_compresses_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_spike_dataset(&dir);
    let request = write_request(
        &dir,
        r#"{
            "baseline": {"startMs": 0, "endMs": 1000},
            "deviation": {"startMs": 1000, "endMs": 2000}
        }"#,
    );

    let output = lsa()
        .arg("analyze")
        .arg("--dataset")
        .arg(&dataset)
        .arg("--request")
        .arg(&request)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(&output.stdout[..2], &[0x1f, 0x8b]);
    assert!(decode_gzip_ndjson(&output.stdout).is_ok());
}

#[test]
fn analyze_honors_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_spike_dataset(&dir);
    let request = write_request(&dir, PLAIN_REQUEST);
    let config = dir.path().join("config.json");
    // Impossible threshold: no term can pass.
    std::fs::write(&config, r#"{"significancePvalue": 1e-300}"#).unwrap();

    let output = lsa()
        .arg("analyze")
        .arg("--dataset")
        .arg(&dataset)
        .arg("--request")
        .arg(&request)
        .arg("--config")
        .arg(&config)
        .output()
        .unwrap();
    assert!(output.status.success());

    let actions = decode_ndjson(&output.stdout).unwrap();
    assert!(!actions
        .iter()
        .any(|a| matches!(a, Action::AddSignificantTerms(_))));
}

// ============================================================================
// Error exit codes
// ============================================================================

#[test]
fn invalid_window_exits_args_error() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_spike_dataset(&dir);
    let request = write_request(
        &dir,
        r#"{
            "baseline": {"startMs": 1000, "endMs": 1000},
            "deviation": {"startMs": 1000, "endMs": 2000},
            "compressResponse": false
        }"#,
    );

    lsa()
        .arg("analyze")
        .arg("--dataset")
        .arg(&dataset)
        .arg("--request")
        .arg(&request)
        .assert()
        .code(10);
}

#[test]
fn missing_dataset_file_exits_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let request = write_request(&dir, PLAIN_REQUEST);

    lsa()
        .arg("analyze")
        .arg("--dataset")
        .arg(dir.path().join("nope.json"))
        .arg("--request")
        .arg(&request)
        .assert()
        .code(11);
}

#[test]
fn missing_required_args_fail() {
    lsa()
        .arg("analyze")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--dataset"));
}

#[test]
fn unknown_command_fails() {
    lsa()
        .arg("nonexistent-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

// ============================================================================
// Version
// ============================================================================

#[test]
fn version_prints_package_version() {
    lsa()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
