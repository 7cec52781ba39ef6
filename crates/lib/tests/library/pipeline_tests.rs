//! End-to-end pipeline runs against local archives.
//!
//! Build steps use `/bin/sh`, so these only run on unix.

#![cfg(unix)]

use std::sync::Arc;

use pour_lib::error::{InstallError, Stage};
use pour_lib::formula::{Category, Dependency, Phase, Version};
use pour_lib::host::{HostCapabilities, Os};
use pour_lib::install::Receipt;
use pour_lib::pipeline::install;
use pour_lib::util::hash::hash_bytes;
use pour_lib::verify::VerificationStatus;
use tokio::sync::Mutex;

use super::common::{Fixture, tool_formula};

fn host() -> HostCapabilities {
  HostCapabilities::new(Os::Linux)
}

#[tokio::test]
async fn verified_install() {
  let fx = Fixture::new();
  let (archive, sha) = fx.tool_archive("tool");
  let desc = tool_formula("tool", &archive, &sha, &fx.build_log(), None);

  let outcome = install(&desc, &host(), &fx.options()).await.unwrap();

  assert_eq!(outcome.state(), "verified");
  assert_eq!(outcome.archive_sha256, sha);
  assert_eq!(std::fs::read_to_string(fx.build_log()).unwrap(), "built\n");

  let bin = fx.prefix.category_dir(Category::Bin).join("tool");
  let man = fx.prefix.category_dir(Category::Man(1)).join("tool.1");
  assert!(bin.exists());
  assert_eq!(std::fs::read_to_string(man).unwrap(), ".TH TOOL 1");
  assert_eq!(outcome.verification.output, "tool 1.0");

  let receipt = Receipt::load(&fx.prefix, "tool").unwrap().unwrap();
  assert_eq!(receipt.files.len(), 2);
  assert_eq!(receipt.verification, VerificationStatus::Passed);
  assert_eq!(fx.scratch_entries(), 0);
}

#[tokio::test]
async fn integrity_mismatch_leaves_no_scratch() {
  let fx = Fixture::new();
  let (archive, _) = fx.tool_archive("tool");
  let wrong = hash_bytes(b"tampered");
  let desc = tool_formula("tool", &archive, &wrong, &fx.build_log(), None);

  let failure = install(&desc, &host(), &fx.options()).await.unwrap_err();

  assert_eq!(failure.stage, Stage::Fetch);
  match failure.error {
    InstallError::IntegrityMismatch { expected, actual, .. } => {
      assert_eq!(expected, wrong.to_string());
      assert_ne!(actual, expected);
    }
    other => panic!("expected IntegrityMismatch, got {:?}", other),
  }
  assert_eq!(fx.scratch_entries(), 0);
  assert!(!fx.build_log().exists());
}

#[tokio::test]
async fn build_failure_touches_no_destination() {
  let fx = Fixture::new();
  let (archive, sha) = fx.tool_archive("tool");
  let desc = tool_formula(
    "tool",
    &archive,
    &sha,
    &fx.build_log(),
    Some("echo xcodebuild: error: unable to find SDK >&2; exit 65"),
  );

  let failure = install(&desc, &host(), &fx.options()).await.unwrap_err();

  assert_eq!(failure.stage, Stage::Build);
  match &failure.error {
    InstallError::BuildStepFailed {
      step_index,
      exit_code,
      output,
      ..
    } => {
      assert_eq!(*step_index, 0);
      assert_eq!(*exit_code, Some(65));
      assert!(output.contains("unable to find SDK"));
    }
    other => panic!("expected BuildStepFailed, got {:?}", other),
  }
  assert_eq!(failure.error.captured_output().map(|o| o.contains("SDK")), Some(true));
  assert!(!fx.prefix.category_dir(Category::Bin).exists());
  assert!(!fx.prefix.category_dir(Category::Man(1)).exists());
  assert!(Receipt::load(&fx.prefix, "tool").unwrap().is_none());
  assert_eq!(fx.scratch_entries(), 0);
}

#[tokio::test]
async fn missing_artifact_never_claims_the_binary() {
  let fx = Fixture::new();
  let (archive, sha) = fx.tool_archive("tool");
  let mut desc = tool_formula("tool", &archive, &sha, &fx.build_log(), Some("true"));
  // Man page first so one mapping succeeds before the missing binary.
  desc.install_mappings.reverse();

  let failure = install(&desc, &host(), &fx.options()).await.unwrap_err();

  assert_eq!(failure.stage, Stage::Install);
  match failure.error {
    InstallError::MissingBuildArtifact {
      built_path,
      category,
      installed,
    } => {
      assert_eq!(built_path, "build/out/tool");
      assert_eq!(category, Category::Bin);
      assert_eq!(installed.len(), 1);
      assert!(installed[0].ends_with("share/man/man1/tool.1"));
    }
    other => panic!("expected MissingBuildArtifact, got {:?}", other),
  }
  assert!(!fx.prefix.category_dir(Category::Bin).join("tool").exists());
  assert_eq!(fx.scratch_entries(), 0);
}

#[tokio::test]
async fn reinstall_is_idempotent() {
  let fx = Fixture::new();
  let (archive, sha) = fx.tool_archive("tool");
  let desc = tool_formula("tool", &archive, &sha, &fx.build_log(), None);

  let first = install(&desc, &host(), &fx.options()).await.unwrap();
  let bin = fx.prefix.category_dir(Category::Bin).join("tool");
  let first_content = std::fs::read(&bin).unwrap();

  let second = install(&desc, &host(), &fx.options()).await.unwrap();

  assert_eq!(std::fs::read(&bin).unwrap(), first_content);
  let hashes = |files: &[pour_lib::install::InstalledFile]| files.iter().map(|f| f.sha256.clone()).collect::<Vec<_>>();
  assert_eq!(hashes(&first.installed.files), hashes(&second.installed.files));
  assert_eq!(std::fs::read_to_string(fx.build_log()).unwrap(), "built\nbuilt\n");
}

#[tokio::test]
async fn unmet_build_dependency_stops_before_fetch() {
  let fx = Fixture::new();
  let (archive, sha) = fx.tool_archive("tool");
  let mut desc = tool_formula("tool", &archive, &sha, &fx.build_log(), None);
  desc.dependencies = vec![
    Dependency {
      name: "xcode".to_string(),
      min_version: Version::parse("10.0"),
      phase: Phase::Build,
    },
    Dependency {
      name: "macos".to_string(),
      min_version: None,
      phase: Phase::Runtime,
    },
  ];

  let failure = install(&desc, &host(), &fx.options()).await.unwrap_err();

  assert_eq!(failure.stage, Stage::Constraints);
  match failure.error {
    InstallError::UnmetBuildDependency { unmet } => {
      assert_eq!(unmet.len(), 1);
      assert_eq!(unmet[0].name, "xcode");
    }
    other => panic!("expected UnmetBuildDependency, got {:?}", other),
  }
  assert!(!fx.scratch.exists());
}

#[tokio::test]
async fn failed_verification_keeps_files_and_records_it() {
  let fx = Fixture::new();
  let (archive, sha) = fx.tool_archive("tool");
  let mut desc = tool_formula("tool", &archive, &sha, &fx.build_log(), None);
  if let Some(test) = desc.test_command.as_mut() {
    test.expect = Some("2.0".to_string());
  }

  let failure = install(&desc, &host(), &fx.options()).await.unwrap_err();

  assert_eq!(failure.stage, Stage::Verify);
  assert!(matches!(failure.error, InstallError::PostInstallVerificationFailed { .. }));
  assert!(fx.prefix.category_dir(Category::Bin).join("tool").exists());
  let receipt = Receipt::load(&fx.prefix, "tool").unwrap().unwrap();
  assert!(matches!(receipt.verification, VerificationStatus::Failed { .. }));
}

#[tokio::test]
async fn concurrent_installs_use_separate_scratch() {
  let fx = Fixture::new();
  let (a_archive, a_sha) = fx.tool_archive("alpha");
  let (b_archive, b_sha) = fx.tool_archive("beta");
  let a = tool_formula("alpha", &a_archive, &a_sha, &fx.path().join("alpha.log"), None);
  let b = tool_formula("beta", &b_archive, &b_sha, &fx.path().join("beta.log"), None);
  let options = fx.options().with_install_gate(Arc::new(Mutex::new(())));
  let host = host();

  let (ra, rb) = tokio::join!(install(&a, &host, &options), install(&b, &host, &options));

  assert_eq!(ra.unwrap().state(), "verified");
  assert_eq!(rb.unwrap().state(), "verified");
  let names: Vec<_> = Receipt::list(&fx.prefix).unwrap().into_iter().map(|r| r.name).collect();
  assert_eq!(names, vec!["alpha", "beta"]);
}
