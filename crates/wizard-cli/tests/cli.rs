use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use serde_json::{Value, json};

const REGISTRY: &str = r#"{
    "0123456789": {
        "fields": {
            "account_name": "ADA OBI",
            "branch": "MARINA",
            "available_balance": 150000.0,
            "lien_type": "PARTIAL"
        }
    }
}"#;

const LIEN_SCRIPT: &str = "\
# account lookup
set account_number 0123456789
lookup 0123456789
next
set reason LOAN COLLATERAL
set start_date 2026-10-01
next
set confirmed true
submit
";

fn wizard() -> Command {
    Command::cargo_bin("account-wizard").expect("binary")
}

fn lien_definition() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("crates dir")
        .join("account-forms/forms/lien_maintenance.json")
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().expect("run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("utf8")
}

#[test]
fn forms_lists_the_catalog() {
    let text = stdout_of(wizard().arg("forms"));
    assert!(text.contains("corporate-account"));
    assert!(text.contains("individual-account"));
    assert!(text.contains("lien-maintenance"));
    assert!(text.contains("(3 steps)"));
}

#[test]
fn describe_accepts_a_definition_file() {
    let text = stdout_of(
        wizard()
            .arg("describe")
            .arg("--spec")
            .arg(lien_definition()),
    );
    let spec: Value = serde_json::from_str(&text).expect("json");
    assert_eq!(spec["id"], "lien-maintenance");
    assert_eq!(spec["steps"].as_array().map(Vec::len), Some(3));
}

#[test]
fn form_and_spec_are_mutually_exclusive() {
    wizard()
        .args(["describe", "--form", "lien-maintenance", "--spec"])
        .arg(lien_definition())
        .assert()
        .failure();
}

#[test]
fn schema_describes_form_definitions() {
    let text = stdout_of(wizard().arg("schema"));
    let schema: Value = serde_json::from_str(&text).expect("json");
    assert!(schema["properties"]["steps"].is_object());
    assert!(schema["properties"]["fields"].is_object());
}

#[test]
fn validate_reports_missing_fields() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let answers = temp.child("answers.json");
    answers.write_str(&json!({ "account_number": "12345" }).to_string())?;

    let output = wizard()
        .args(["validate", "--form", "lien-maintenance", "--answers"])
        .arg(answers.path())
        .output()?;
    assert!(!output.status.success());
    let text = String::from_utf8(output.stdout)?;
    assert!(text.contains("Validation result: invalid"));
    assert!(text.contains("/account_number - "));
    assert!(text.contains("Missing required: "));
    assert!(text.contains("/account_name"));
    Ok(())
}

#[test]
fn validate_accepts_complete_answers() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let answers = temp.child("answers.json");
    answers.write_str(
        &json!({
            "account_number": "0123456789",
            "account_name": "ADA OBI",
            "reason": "COURT ORDER",
            "start_date": "2026-10-01",
            "confirmed": true
        })
        .to_string(),
    )?;

    let text = stdout_of(
        wizard()
            .args(["validate", "--form", "lien-maintenance", "--answers"])
            .arg(answers.path()),
    );
    assert!(text.contains("Validation result: valid"));
    Ok(())
}

#[test]
fn step_stays_where_navigation_is_blocked() {
    let output = wizard()
        .args(["step", "--form", "lien-maintenance", "--step", "3"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    let stderr = String::from_utf8(output.stderr).expect("utf8");
    assert!(stdout.contains("Step 1/3: Account Lookup"));
    assert!(stderr.contains("Cannot reach step 3"));
}

#[test]
fn step_renders_json_views() {
    let text = stdout_of(wizard().args([
        "step",
        "--form",
        "lien-maintenance",
        "--format",
        "json",
    ]));
    let view: Value = serde_json::from_str(&text).expect("json");
    assert_eq!(view["step"], 1);
}

#[test]
fn scripted_session_submits_and_writes_the_application()
-> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let script = temp.child("lien.script");
    script.write_str(LIEN_SCRIPT)?;
    let registry = temp.child("registry.json");
    registry.write_str(REGISTRY)?;
    let out = temp.child("application.json");

    let text = stdout_of(
        wizard()
            .args(["run", "--form", "lien-maintenance", "--script"])
            .arg(script.path())
            .arg("--registry")
            .arg(registry.path())
            .arg("--output")
            .arg(out.path()),
    );
    assert!(text.contains("Prefilled: "));
    assert!(text.contains("Ignored: lien_type"));
    assert!(text.contains("Submitted: LM000001"));
    assert!(text.contains("Session Submitted on step 3"));

    let written: Value = serde_json::from_str(&fs::read_to_string(out.path())?)?;
    assert_eq!(written["reference"], "LM000001");
    assert_eq!(written["application"]["fields"]["account_name"], "ADA OBI");
    assert_eq!(written["application"]["fields"]["lien_type"], "FULL");
    Ok(())
}

#[test]
fn incomplete_step_keeps_the_session_open() {
    let text = stdout_of(
        wizard()
            .args(["run", "--form", "lien-maintenance"])
            .write_stdin("set account_number 12345\nnext\nquit\n"),
    );
    assert!(text.contains("Step 1 is incomplete:"));
    assert!(text.contains("/account_number - "));
    assert!(text.contains("Session Active on step 1"));
}

#[test]
fn lookups_without_a_registry_are_skipped() {
    let text = stdout_of(
        wizard()
            .args(["run", "--form", "lien-maintenance"])
            .write_stdin("lookup 0123456789\n"),
    );
    assert!(text.contains("No registry loaded"));
}
