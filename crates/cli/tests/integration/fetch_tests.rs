use predicates::prelude::*;

use super::common::{TestEnv, tool_formula};

#[test]
fn fetch_reports_digest() {
  let env = TestEnv::new();
  let (archive, sha256) = env.tool_archive("tool");
  env.write_formula("tool", &tool_formula("tool", &archive, &sha256, ""));

  env
    .pour_cmd()
    .args(["fetch", "tool"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Fetched tool@1.0"))
    .stdout(predicate::str::contains(sha256.as_str()));
}

#[test]
fn fetch_reports_digest_mismatch() {
  let env = TestEnv::new();
  let (archive, sha256) = env.tool_archive("tool");
  let wrong = "0".repeat(64);
  env.write_formula("tool", &tool_formula("tool", &archive, &wrong, ""));

  env
    .pour_cmd()
    .args(["fetch", "tool"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("integrity mismatch"))
    .stderr(predicate::str::contains(sha256.as_str()));
}
