#![cfg(unix)]

use predicates::prelude::*;

use super::common::{TestEnv, tool_formula};

const MISSING_TOOLCHAIN: &str = r#"
[[depends_on]]
name = "pour-test-missing-toolchain"
version = "1.0"
phase = "build"
"#;

#[test]
fn check_without_dependencies_succeeds() {
  let env = TestEnv::new();
  env.tool("tool");

  env
    .pour_cmd()
    .args(["check", "tool"])
    .assert()
    .success()
    .stdout(predicate::str::contains("No dependencies"));
}

#[test]
fn check_fails_on_unmet_build_dependency() {
  let env = TestEnv::new();
  let (archive, sha256) = env.tool_archive("tool");
  env.write_formula("tool", &tool_formula("tool", &archive, &sha256, MISSING_TOOLCHAIN));

  env
    .pour_cmd()
    .args(["check", "tool"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("pour-test-missing-toolchain (build) >= 1.0, not found"))
    .stderr(predicate::str::contains("unmet build dependencies"));
}

#[test]
fn install_stops_before_fetch_on_unmet_build_dependency() {
  let env = TestEnv::new();
  let (archive, sha256) = env.tool_archive("tool");
  env.write_formula("tool", &tool_formula("tool", &archive, &sha256, MISSING_TOOLCHAIN));

  env
    .pour_cmd()
    .args(["install", "tool"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("failed at stage constraints"));

  assert_eq!(std::fs::read_dir(env.scratch_path()).unwrap().count(), 0);
}

#[test]
fn check_json_reports_outcomes() {
  let env = TestEnv::new();
  let (archive, sha256) = env.tool_archive("tool");
  env.write_formula("tool", &tool_formula("tool", &archive, &sha256, MISSING_TOOLCHAIN));

  let output = env.pour_cmd().args(["check", "tool", "-o", "json"]).output().unwrap();
  assert!(!output.status.success());

  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["satisfied"], false);
  assert_eq!(json["outcomes"][0]["dependency"]["name"], "pour-test-missing-toolchain");
}
