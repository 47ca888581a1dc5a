// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Integration tests for the cabletrace CLI commands

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

const SW1: &str = "00000000-0000-4000-8000-000000000001";
const SW2: &str = "00000000-0000-4000-8000-000000000002";
const PP1: &str = "00000000-0000-4000-8000-000000000003";
const ETH1: &str = "00000000-0000-4000-8000-000000000011";
const ETH2: &str = "00000000-0000-4000-8000-000000000012";
const REAR: &str = "00000000-0000-4000-8000-000000000013";
const FRONT: &str = "00000000-0000-4000-8000-000000000014";
const SPARE: &str = "00000000-0000-4000-8000-000000000015";

/// Run cabletrace against a data directory
fn cabletrace(data_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cabletrace").unwrap();
    cmd.env("CABLETRACE_DATA_DIR", data_dir.path())
        .env_remove("CABLETRACE_CONFIG")
        .env_remove("RUST_LOG")
        .arg("--no-color");
    cmd
}

/// sw1:eth1 -> pp1 front1/rear1 -> sw2:eth1, plus an uncabled sw2:eth2
fn import_document() -> String {
    format!(
        r#"{{
  "devices": [
    {{"id": "{SW1}", "name": "sw1"}},
    {{"id": "{SW2}", "name": "sw2"}},
    {{"id": "{PP1}", "name": "pp1"}}
  ],
  "terminations": [
    {{"id": "{ETH1}", "name": "eth1", "device": "{SW1}", "type": "interface", "interface_type": "1000base-t"}},
    {{"id": "{FRONT}", "name": "front1", "device": "{PP1}", "type": "frontport", "rear_port": "{REAR}", "rear_port_position": 1}},
    {{"id": "{REAR}", "name": "rear1", "device": "{PP1}", "type": "rearport", "positions": 1}},
    {{"id": "{ETH2}", "name": "eth1", "device": "{SW2}", "type": "interface", "interface_type": "1000base-t"}},
    {{"id": "{SPARE}", "name": "eth2", "device": "{SW2}", "type": "interface", "interface_type": "1000base-t"}}
  ],
  "cables": [
    {{"type": "cat6", "length": 2, "length_unit": "m", "a_terminations": ["{ETH1}"], "b_terminations": ["{FRONT}"]}},
    {{"label": "riser-7", "a_terminations": ["{REAR}"], "b_terminations": ["{ETH2}"]}}
  ]
}}"#
    )
}

fn imported() -> TempDir {
    let data_dir = TempDir::new().unwrap();
    let doc = data_dir.path().join("plant.json");
    fs::write(&doc, import_document()).unwrap();

    cabletrace(&data_dir)
        .arg("import")
        .arg(&doc)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 5 termination(s) and 2 cable(s); 2 path(s) traced"));
    data_dir
}

fn json(output: &[u8]) -> Value {
    serde_json::from_slice(output).unwrap()
}

#[test]
fn test_import_and_trace() {
    let data_dir = imported();
    assert!(data_dir.path().join("topology.json").exists());

    cabletrace(&data_dir)
        .args(["trace", "sw1:eth1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sw1:eth1 (interface)"))
        .stdout(predicate::str::contains("sw2:eth1 (interface)"))
        .stdout(predicate::str::contains("riser-7"))
        .stdout(predicate::str::contains("Status:   complete_active"))
        .stdout(predicate::str::contains("Segments: 2"))
        .stdout(predicate::str::contains("(some cables have no length)"));
}

#[test]
fn test_trace_json_report() {
    let data_dir = imported();

    let output = cabletrace(&data_dir)
        .args(["--json", "trace", ETH2])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report = json(&output.stdout);
    assert_eq!(report["state"], "complete_active");
    assert_eq!(report["is_complete"], true);
    assert_eq!(report["cables"].as_array().unwrap().len(), 2);
    assert_eq!(report["total_length"], 2.0);
    assert_eq!(report["length_is_definitive"], false);
}

#[test]
fn test_trace_uncabled_termination() {
    let data_dir = imported();

    cabletrace(&data_dir)
        .args(["trace", "sw2:eth2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sw2:eth2 is not cabled"));
}

#[test]
fn test_ambiguous_name_is_rejected() {
    let data_dir = imported();

    cabletrace(&data_dir)
        .args(["trace", "eth1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ambiguous"));
}

#[test]
fn test_cable_lifecycle() {
    let data_dir = imported();

    // Moving the far end retraces the path onto the spare interface
    let output = cabletrace(&data_dir)
        .args(["--json", "cable", "list"])
        .output()
        .unwrap();
    let cables = json(&output.stdout);
    let riser = cables
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["label"] == "riser-7")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    cabletrace(&data_dir)
        .args(["cable", "update", &riser, "-b", "sw2:eth2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated cable"));

    cabletrace(&data_dir)
        .args(["trace", "sw1:eth1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sw2:eth2 (interface)"));

    cabletrace(&data_dir)
        .args(["trace", "sw2:eth1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is not cabled"));

    // Planning the patch cable deactivates the path
    cabletrace(&data_dir)
        .args(["cable", "update", &riser, "--status", "planned"])
        .assert()
        .success();
    cabletrace(&data_dir)
        .args(["trace", "sw1:eth1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("complete_inactive"));

    // Deleting it truncates the path at the rear port
    cabletrace(&data_dir)
        .args(["cable", "delete", &riser[..8]])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted cable"));
    cabletrace(&data_dir)
        .args(["trace", "sw1:eth1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Status:   incomplete"));
}

#[test]
fn test_cable_connect_validation_error() {
    let data_dir = imported();

    cabletrace(&data_dir)
        .args(["cable", "connect", "-a", "sw2:eth2", "-b", "sw1:eth1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already has a cable attached"));

    cabletrace(&data_dir)
        .args(["cable", "connect", "-a", "sw2:eth2", "-b", "sw2:eth2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot connect to the same object"));
}

#[test]
fn test_path_commands() {
    let data_dir = imported();

    let output = cabletrace(&data_dir)
        .args(["--json", "path", "list"])
        .output()
        .unwrap();
    let paths = json(&output.stdout);
    let paths = paths.as_array().unwrap();
    assert_eq!(paths.len(), 2);
    assert!(paths.iter().all(|p| p["state"] == "complete_active"));

    let id = paths[0]["id"].as_str().unwrap().to_string();
    cabletrace(&data_dir)
        .args(["path", "show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("segments:    2"));

    cabletrace(&data_dir)
        .args(["path", "retrace"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Retraced 2 path(s); 0 deleted"));

    cabletrace(&data_dir)
        .args(["path", "rebuild"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Traced 2 path(s): 2 complete, 0 split, 0 failed"));

    cabletrace(&data_dir)
        .args(["path", "groups"])
        .assert()
        .success()
        .stdout(predicate::str::contains("group 1:"));
}

#[test]
fn test_export_dot() {
    let data_dir = imported();

    cabletrace(&data_dir)
        .args(["export", "--format", "dot"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("graph cabletrace {"))
        .stdout(predicate::str::contains("cluster_"))
        .stdout(predicate::str::contains("riser-7"));
}

#[test]
fn test_export_unknown_format() {
    let data_dir = TempDir::new().unwrap();

    cabletrace(&data_dir)
        .args(["export", "--format", "yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown export format"));
}

#[test]
fn test_config_reports_overrides() {
    let data_dir = TempDir::new().unwrap();

    cabletrace(&data_dir)
        .env("CABLETRACE_MAX_SEGMENTS", "7")
        .args(["config", "max_segments"])
        .assert()
        .success()
        .stdout(predicate::str::diff("7\n"));
}

#[test]
fn test_completions() {
    let data_dir = TempDir::new().unwrap();

    cabletrace(&data_dir)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cabletrace"));
}
