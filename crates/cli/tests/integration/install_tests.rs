#![cfg(unix)]

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn install_then_list() {
  let env = TestEnv::new();
  env.tool("tool");

  env
    .pour_cmd()
    .args(["install", "tool"])
    .assert()
    .success()
    .stdout(predicate::str::contains("tool@1.0 verified"));

  assert!(env.prefix_path().join("bin/tool").exists());
  assert!(env.prefix_path().join("share/man/man1/tool.1").exists());
  assert!(env.prefix_path().join("var/db/pour/tool.json").exists());
  assert_eq!(std::fs::read_dir(env.scratch_path()).unwrap().count(), 0);

  env
    .pour_cmd()
    .arg("list")
    .assert()
    .success()
    .stdout(predicate::str::contains("tool 1.0 (passed, 2 files)"));
}

#[test]
fn install_by_path() {
  let env = TestEnv::new();
  let formula = env.tool("tool");

  env.pour_cmd().arg("install").arg(&formula).assert().success();
  assert!(env.prefix_path().join("bin/tool").exists());
}

#[test]
fn install_several_concurrently() {
  let env = TestEnv::new();
  env.tool("alpha");
  env.tool("beta");

  env
    .pour_cmd()
    .args(["install", "alpha", "beta"])
    .assert()
    .success()
    .stdout(predicate::str::contains("alpha@1.0 verified"))
    .stdout(predicate::str::contains("beta@1.0 verified"));

  assert!(env.prefix_path().join("bin/alpha").exists());
  assert!(env.prefix_path().join("bin/beta").exists());
}

#[test]
fn install_json_output() {
  let env = TestEnv::new();
  env.tool("tool");

  let output = env.pour_cmd().args(["install", "tool", "-o", "json"]).output().unwrap();
  assert!(output.status.success());

  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json[0]["formula"], "tool@1.0");
  assert_eq!(json[0]["state"], "verified");
  assert_eq!(json[0]["outcome"]["installed"]["files"].as_array().unwrap().len(), 2);
}

#[test]
fn failing_build_reports_stage_and_output() {
  let env = TestEnv::new();
  let (archive, sha256) = env.tool_archive("tool");
  let formula = super::common::tool_formula("tool", &archive, &sha256, "")
    .replace("mkdir -p build/out && cp tool.sh build/out/tool", "echo no project here >&2; exit 65");
  env.write_formula("tool", &formula);

  env
    .pour_cmd()
    .args(["install", "tool"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("failed at stage build"))
    .stderr(predicate::str::contains("no project here"))
    .stderr(predicate::str::contains("1 of 1 installs failed"));

  assert!(!env.prefix_path().join("bin/tool").exists());
  assert!(!env.prefix_path().join("var/db/pour/tool.json").exists());
}

#[test]
fn keep_scratch_retains_failed_build() {
  let env = TestEnv::new();
  let (archive, sha256) = env.tool_archive("tool");
  let formula = super::common::tool_formula("tool", &archive, &sha256, "")
    .replace("mkdir -p build/out && cp tool.sh build/out/tool", "exit 1");
  env.write_formula("tool", &formula);

  env
    .pour_cmd()
    .args(["install", "tool", "--keep-scratch"])
    .assert()
    .failure();

  assert_eq!(std::fs::read_dir(env.scratch_path()).unwrap().count(), 1);
}
