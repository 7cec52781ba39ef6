#![cfg(unix)]

use pour_lib::install::Prefix;
use pour_lib::prefix_lock::{LockMode, PrefixLock};
use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn uninstall_removes_installed_files() {
  let env = TestEnv::new();
  env.tool("tool");
  env.pour_cmd().args(["install", "tool"]).assert().success();

  env
    .pour_cmd()
    .args(["uninstall", "tool", "--force"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Uninstalled tool"));

  assert!(!env.prefix_path().join("bin/tool").exists());
  assert!(!env.prefix_path().join("share/man/man1/tool.1").exists());
  env
    .pour_cmd()
    .arg("list")
    .assert()
    .success()
    .stdout(predicate::str::contains("Nothing installed"));
}

#[test]
fn uninstall_requires_force_without_terminal() {
  let env = TestEnv::new();
  env.tool("tool");
  env.pour_cmd().args(["install", "tool"]).assert().success();

  env
    .pour_cmd()
    .args(["uninstall", "tool"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Use --force"));

  assert!(env.prefix_path().join("bin/tool").exists());
}

#[test]
fn uninstall_keeps_modified_files() {
  let env = TestEnv::new();
  env.tool("tool");
  env.pour_cmd().args(["install", "tool"]).assert().success();
  std::fs::write(env.prefix_path().join("bin/tool"), "#!/bin/sh\necho edited\n").unwrap();

  env
    .pour_cmd()
    .args(["uninstall", "tool", "--force"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Uninstalled tool"))
    .stderr(predicate::str::contains("modified after install"));

  assert!(env.prefix_path().join("bin/tool").exists());
  assert!(!env.prefix_path().join("share/man/man1/tool.1").exists());
  env
    .pour_cmd()
    .arg("list")
    .assert()
    .success()
    .stdout(predicate::str::contains("Nothing installed"));
}

#[test]
fn uninstall_waits_for_prefix_lock_before_prompting() {
  let env = TestEnv::new();
  env.tool("tool");
  env.pour_cmd().args(["install", "tool"]).assert().success();

  let prefix = Prefix::new(env.prefix_path());
  let _held = PrefixLock::acquire(&prefix, LockMode::Exclusive, "install").unwrap();

  env
    .pour_cmd()
    .args(["uninstall", "tool"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("locked by another process"))
    .stderr(predicate::str::contains("Use --force").not());

  assert!(env.prefix_path().join("bin/tool").exists());
}

#[test]
fn test_reruns_verification() {
  let env = TestEnv::new();
  env.tool("tool");
  env.pour_cmd().args(["install", "tool", "--skip-verify"]).assert().success();

  env
    .pour_cmd()
    .arg("list")
    .assert()
    .success()
    .stdout(predicate::str::contains("(skipped"));

  env
    .pour_cmd()
    .args(["test", "tool"])
    .assert()
    .success()
    .stdout(predicate::str::contains("passed"));

  env
    .pour_cmd()
    .arg("list")
    .assert()
    .success()
    .stdout(predicate::str::contains("(passed"));
}
