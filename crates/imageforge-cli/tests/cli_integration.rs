//! CLI subprocess integration tests.
//!
//! These tests invoke the `imageforge` binary as a subprocess and
//! verify exit codes, stdout content, and JSON output stability.

use std::process::Command;

const IMAGE_ID: &str = "/subscriptions/s/resourceGroups/g/providers/Microsoft.Compute/images/out";

fn imageforge_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_imageforge"));
    // force the deterministic mock environment regardless of the host
    cmd.env_remove("IMAGEFORGE_SUBSCRIPTION_ID");
    cmd
}

fn write_manifest(dir: &std::path::Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("imageforge.toml");
    std::fs::write(&path, content).unwrap();
    path
}

fn valid_manifest(dir: &std::path::Path) -> std::path::PathBuf {
    write_manifest(
        dir,
        &format!(
            r#"source = "Canonical:UbuntuServer:18.04-LTS:latest"
image_resource_id = "{IMAGE_ID}"
"#
        ),
    )
}

#[test]
fn cli_version_exits_zero() {
    let output = imageforge_bin().arg("--version").output().unwrap();
    assert!(output.status.success(), "imageforge --version must exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("imageforge"),
        "version output must contain 'imageforge': {stdout}"
    );
}

#[test]
fn cli_help_lists_subcommands() {
    let output = imageforge_bin().arg("--help").output().unwrap();
    assert!(output.status.success(), "imageforge --help must exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["validate", "plan", "build", "doctor"] {
        assert!(stdout.contains(command), "help must list '{command}'");
    }
}

#[test]
fn validate_accepts_a_minimal_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = valid_manifest(dir.path());

    let output = imageforge_bin()
        .args(["validate", &manifest.to_string_lossy(), "--json"])
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let payload: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout must be JSON");
    assert_eq!(payload["valid"], true);
    assert_eq!(payload["image_resource_id"], IMAGE_ID);
}

#[test]
fn validate_reports_all_violations_with_config_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(
        dir.path(),
        "from_scratch = true\nsource = \"P:O:S:1\"\nos_disk_cache_type = \"Sideways\"\n",
    );

    let output = imageforge_bin()
        .args(["validate", &manifest.to_string_lossy()])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid build configuration"));
    // the whole aggregate in one pass, not just the first violation
    assert!(stderr.contains("from_scratch"));
    assert!(stderr.contains("Sideways"));
    assert!(stderr.contains("image_resource_id or shared_image_destination"));
}

#[test]
fn malformed_toml_gets_the_manifest_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), "source = [not toml");

    let output = imageforge_bin()
        .args(["validate", &manifest.to_string_lossy()])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn plan_lists_the_step_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = valid_manifest(dir.path());

    let output = imageforge_bin()
        .args(["plan", &manifest.to_string_lossy(), "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let steps: Vec<&str> = payload["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap())
        .collect();
    assert_eq!(steps.first(), Some(&"resolve-version"));
    assert!(steps.contains(&"create-disk"));
    assert_eq!(steps.last(), Some(&"create-image"));
}

#[test]
fn mock_build_succeeds_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = valid_manifest(dir.path());

    let output = imageforge_bin()
        .args(["build", &manifest.to_string_lossy(), "--backend", "mock", "--json"])
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["status"], "built");
    assert_eq!(payload["image_resource_id"], IMAGE_ID);
    assert_eq!(payload["retained_resources"], serde_json::json!([]));
}

#[test]
fn skip_cleanup_surfaces_the_retained_disk() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(
        dir.path(),
        &format!(
            r#"source = "P:O:S:1"
image_resource_id = "{IMAGE_ID}"
skip_cleanup = true
"#
        ),
    );

    let output = imageforge_bin()
        .args(["build", &manifest.to_string_lossy(), "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let retained = payload["retained_resources"].as_array().unwrap();
    assert_eq!(retained.len(), 1);
    assert!(retained[0]
        .as_str()
        .unwrap()
        .contains("/disks/imageforge-osdisk-"));
}

#[test]
fn missing_manifest_file_fails_cleanly() {
    let output = imageforge_bin()
        .args(["validate", "/nonexistent/imageforge.toml"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read manifest"));
}
