//! CLI-only smoke tests that don't require a package manager or any
//! installed plugins.

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// Every subcommand resolves its state/config roots off the platform data
/// directory (`directories_next::ProjectDirs`), which in turn reads `HOME`
/// on Linux. Point it at a scratch directory so tests never touch the
/// invoking user's real plugin state.
fn isolated_home() -> TempDir {
    TempDir::new().unwrap()
}

#[test]
fn doctor_json_reports_empty_state_with_no_plugins_installed() {
    let home = isolated_home();
    let mut cmd = Command::cargo_bin("weave").unwrap();
    let assert = cmd
        .env("HOME", home.path())
        .args(["plugin", "doctor", "--output-format", "json"])
        .assert();

    let output = assert.get_output();
    assert!(
        output.status.success(),
        "doctor failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: Value = serde_json::from_str(stdout.trim())
        .unwrap_or_else(|e| panic!("doctor --output-format json produced non-JSON: {e}\n{stdout}"));

    assert_eq!(parsed["loaded"].as_array().unwrap().len(), 0);
    assert_eq!(parsed["skipped"].as_array().unwrap().len(), 0);
    assert_eq!(parsed["errors"].as_array().unwrap().len(), 0);
}

#[test]
fn scaffold_writes_a_buildable_plugin_skeleton() {
    let home = isolated_home();
    let target = TempDir::new().unwrap();
    let plugin_dir = target.path().join("my-plugin");

    let mut cmd = Command::cargo_bin("weave").unwrap();
    let assert = cmd
        .env("HOME", home.path())
        .args(["plugin", "scaffold", "my-plugin"])
        .arg(&plugin_dir)
        .assert();

    let output = assert.get_output();
    assert!(
        output.status.success(),
        "scaffold failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    assert!(plugin_dir.join("Cargo.toml").is_file());
    assert!(plugin_dir.join("plugin.json").is_file());
    assert!(plugin_dir.join("weave-build.json").is_file());
    assert!(plugin_dir.join("src").join("lib.rs").is_file());

    let manifest: Value =
        serde_json::from_str(&std::fs::read_to_string(plugin_dir.join("plugin.json")).unwrap())
            .unwrap();
    assert_eq!(manifest["name"], "my-plugin");
    assert_eq!(manifest["hostVersionRange"], "*");

    let lib_rs = std::fs::read_to_string(plugin_dir.join("src").join("lib.rs")).unwrap();
    assert!(lib_rs.contains("impl Plugin for ScaffoldedPlugin"));
    assert!(lib_rs.contains("export_plugin!(ScaffoldedPlugin)"));
}

#[test]
fn validate_rejects_a_manifest_missing_required_fields() {
    let home = isolated_home();
    let plugin_dir = TempDir::new().unwrap();
    std::fs::write(
        plugin_dir.path().join("plugin.json"),
        r#"{"name":"incomplete"}"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("weave").unwrap();
    let assert = cmd
        .env("HOME", home.path())
        .args(["plugin", "validate", "--output-format", "json"])
        .arg(plugin_dir.path().join("plugin.json"))
        .assert();

    let output = assert.get_output();
    assert!(
        !output.status.success(),
        "validate should exit non-zero for an invalid manifest"
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: Value = serde_json::from_str(stdout.trim())
        .unwrap_or_else(|e| panic!("validate --output-format json produced non-JSON: {e}\n{stdout}"));

    assert_eq!(parsed["valid"], false);
    let errors = parsed["errors"].as_array().unwrap();
    assert!(!errors.is_empty());
    assert!(errors
        .iter()
        .any(|e| e["field"] == "version" || e["field"] == "entryPoint"));
}

#[test]
fn validate_accepts_a_complete_manifest_but_flags_a_missing_entry_point() {
    let home = isolated_home();
    let plugin_dir = TempDir::new().unwrap();
    let manifest = r#"{
        "name": "demo",
        "version": "1.0.0",
        "description": "a demo plugin",
        "author": "someone",
        "entryPoint": "./libdemo.so",
        "hostVersionRange": ">=0.1.0",
        "extensionPoints": ["commands"]
    }"#;
    std::fs::write(plugin_dir.path().join("plugin.json"), manifest).unwrap();

    let mut cmd = Command::cargo_bin("weave").unwrap();
    let assert = cmd
        .env("HOME", home.path())
        .args(["plugin", "validate", "--output-format", "json"])
        .arg(plugin_dir.path().join("plugin.json"))
        .assert();

    let output = assert.get_output();
    // The manifest itself is well-formed, but the declared entry point was
    // never built, so the overall validation still fails.
    assert!(!output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(parsed["valid"], false);
}
