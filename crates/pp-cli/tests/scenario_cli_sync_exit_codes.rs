use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

/// Memory stores and an upstream on a closed local port: FuelCheck init
/// fails with a transport error after one attempt.
fn write_config(dir: &Path) -> String {
    let cache = dir.join("token.json");
    let yaml = format!(
        r#"
fuelcheck:
  base_url: "http://127.0.0.1:1"
  token_cache_path: "{}"
  max_token_attempts: 1
  timeout_secs: 2
  keys_env:
    api_key: "PP_CLI_TEST_KEY"
    api_secret: "PP_CLI_TEST_SECRET"
stores:
  document:
    kind: "memory"
  realtime:
    kind: "memory"
"#,
        cache.to_string_lossy().replace('\\', "/")
    );
    let path = dir.join("sync.yaml");
    fs::write(&path, yaml).unwrap();
    path.to_string_lossy().to_string()
}

fn pp(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("pp").unwrap();
    cmd.current_dir(dir).env("RUST_LOG", "warn");
    cmd
}

#[test]
fn init_failure_exits_2_with_summary() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    pp(dir.path())
        .env("PP_CLI_TEST_KEY", "key")
        .env("PP_CLI_TEST_SECRET", "s3cr3t-value")
        .args(["sync", "--config", &config])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("status=init_failed"))
        .stdout(predicate::str::contains("init_error collaborator=fuelcheck"))
        .stderr(predicate::str::contains("s3cr3t-value").not());
}

#[test]
fn init_failure_json_summary() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let out = pp(dir.path())
        .env("PP_CLI_TEST_KEY", "key")
        .env("PP_CLI_TEST_SECRET", "s3cr3t-value")
        .args(["sync", "--json", "--config", &config])
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(2));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["status"], "init_failed");
    assert_eq!(v["init_errors"][0]["collaborator"], "fuelcheck");
    assert_eq!(v["collections"].as_array().map(Vec::len), Some(0));
}

#[test]
fn missing_credentials_exit_1_before_any_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    pp(dir.path())
        .env_remove("PP_CLI_TEST_KEY")
        .env_remove("PP_CLI_TEST_SECRET")
        .args(["sync", "--config", &config])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("SECRETS_MISSING scope=SYNC"))
        .stderr(predicate::str::contains("PP_CLI_TEST_KEY"));
}

#[test]
fn strict_config_rejects_unknown_keys() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let extra = dir.path().join("extra.yaml");
    fs::write(&extra, "sync:\n  interval_minutes: 5\n").unwrap();

    pp(dir.path())
        .env("PP_CLI_TEST_KEY", "key")
        .env("PP_CLI_TEST_SECRET", "s3cr3t-value")
        .args([
            "sync",
            "--strict-config",
            "--config",
            &config,
            "--config",
            extra.to_str().unwrap(),
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("/sync/interval_minutes"));
}
