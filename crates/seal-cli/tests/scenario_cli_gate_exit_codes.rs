use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const DECLARED: &str = r#"{
  "env": "production",
  "dbVersion": "postgres-14.5",
  "securityGroup": ["allow_ssh", "allow_web"],
  "tags": { "owner": "akshaya", "cost_center": "voryx" }
}"#;

const LIVE: &str = r#"{
  "env": "production",
  "dbVersion": "postgres-15.0",
  "securityGroup": ["allow_ssh"],
  "tags": { "owner": "akshaya", "cost_center": "voryx", "temp_tag": "test" }
}"#;

fn write(dir: &Path, name: &str, body: &str) -> String {
    let p = dir.join(name);
    fs::write(&p, body).unwrap();
    p.to_string_lossy().to_string()
}

#[test]
fn gate_blocks_severe_drift_with_exit_2() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let declared = write(dir.path(), "declared.json", DECLARED);
    let live = write(dir.path(), "live.json", LIVE);

    Command::cargo_bin("infraseal")?
        .args(["gate", "--declared", &declared, "--live", &live])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("recommendation=severe_drift"))
        .stdout(predicate::str::contains("total_severity=9.5"))
        .stdout(predicate::str::contains("gate=blocked"));
    Ok(())
}

#[test]
fn gate_permits_equal_states() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let declared = write(dir.path(), "declared.json", DECLARED);
    let same = write(dir.path(), "live.json", DECLARED);

    Command::cargo_bin("infraseal")?
        .args(["gate", "--declared", &declared, "--live", &same])
        .assert()
        .success()
        .stdout(predicate::str::contains("findings=0"))
        .stdout(predicate::str::contains("gate=permitted"));
    Ok(())
}

#[test]
fn block_at_flag_overrides_config() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let declared = write(dir.path(), "declared.json", r#"{ "env": "production" }"#);
    let live = write(dir.path(), "live.json", r#"{ "env": "staging", "owner": "x" }"#);

    // Two generic changes: 2.0 → minor_drift. Permitted by default...
    Command::cargo_bin("infraseal")?
        .args(["gate", "--declared", &declared, "--live", &live])
        .assert()
        .success()
        .stdout(predicate::str::contains("recommendation=minor_drift"));

    // ...blocked when the flag lowers the bar.
    Command::cargo_bin("infraseal")?
        .args([
            "gate",
            "--declared",
            &declared,
            "--live",
            &live,
            "--block-at",
            "minor_drift",
        ])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("block_at=minor_drift"));
    Ok(())
}

#[test]
fn invalid_config_fails_before_comparing() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let declared = write(dir.path(), "declared.json", DECLARED);
    let live = write(dir.path(), "live.json", LIVE);
    let cfg = write(
        dir.path(),
        "rules.yaml",
        "rules:\n  - match: { exact: instanceType }\n    category: INSTANCE_TYPE_CHANGE\n    severity: 3\n",
    );

    Command::cargo_bin("infraseal")?
        .args(["gate", "--declared", &declared, "--live", &live, "--config", &cfg])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid rule set"));
    Ok(())
}
