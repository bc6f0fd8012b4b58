// Regression tests for the carinata binary.
// Requires: assert_cmd, predicates, tempfile in [dev-dependencies]

use std::fs;

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};
use tempfile::TempDir;

fn carinata() -> Command {
    let mut cmd = Command::cargo_bin("carinata").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn cli_reports_miette_diagnostics_on_error() {
    let dir = TempDir::new().unwrap();
    let specs = dir.path().join("specs");
    fs::create_dir(&specs).unwrap();
    fs::write(
        specs.join("bad.carinata"),
        "describe \"A\":\n    it \"x\":\n        it \"y\": pass\n",
    )
    .unwrap();

    carinata()
        .arg("generate")
        .arg(&specs)
        .arg("--output-dir")
        .arg(dir.path().join("out"))
        .assert()
        .failure()
        .stderr(contains("carinata::parse").and(contains("help:")));
}

#[test]
fn generate_writes_and_reports() {
    let dir = TempDir::new().unwrap();
    let specs = dir.path().join("specs");
    let out = dir.path().join("out");
    fs::create_dir(&specs).unwrap();
    fs::write(
        specs.join("calc.carinata"),
        "describe \"Calc\":\n    it \"adds\": assert 1 + 1 == 2\n",
    )
    .unwrap();

    carinata()
        .arg("generate")
        .arg(&specs)
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(contains("generated").and(contains("1 generated, 0 unchanged")));
    assert!(out.join("calc.py").is_file());

    carinata()
        .arg("generate")
        .arg(&specs)
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(contains("0 generated, 1 unchanged"));
}

#[test]
fn check_fails_when_outputs_are_missing() {
    let dir = TempDir::new().unwrap();
    let specs = dir.path().join("specs");
    fs::create_dir(&specs).unwrap();
    fs::write(specs.join("a.carinata"), "describe \"A\":\n    it \"x\": pass\n").unwrap();

    carinata()
        .arg("check")
        .arg(&specs)
        .arg("-o")
        .arg(dir.path().join("out"))
        .assert()
        .failure()
        .stdout(contains("missing"));
}

#[test]
fn tree_prints_outline_and_json() {
    let dir = TempDir::new().unwrap();
    let spec = dir.path().join("a.carinata");
    fs::write(&spec, "describe \"A\":\n    let \"value\": 3\n    it \"x\": pass\n").unwrap();

    carinata()
        .arg("tree")
        .arg(&spec)
        .assert()
        .success()
        .stdout(contains("describe \"A\"").and(contains("let \"value\"")));

    carinata()
        .arg("tree")
        .arg(&spec)
        .arg("--json")
        .assert()
        .success()
        .stdout(contains("\"kind\": \"let\"").and(contains("\"text\": \"return 3\"")));
}

#[test]
fn unknown_config_keys_are_rejected() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("carinata.yaml");
    fs::write(&config, "outputs: nowhere\n").unwrap();

    carinata()
        .arg("--config")
        .arg(&config)
        .arg("check")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(contains("carinata::config"));
}
