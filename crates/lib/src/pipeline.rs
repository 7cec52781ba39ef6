//! The install pipeline.
//!
//! Starting from a resolved descriptor, stages run strictly in order:
//!
//! 1. constraints - check dependencies against the host
//! 2. fetch - download, verify the digest, extract into scratch
//! 3. build - run the build steps in the scratch build path
//! 4. install - copy mapped artifacts into the prefix
//! 5. verify - run the test command, write the receipt
//!
//! The first failing stage ends the run with a [`PipelineFailure`] naming it.
//! Cancellation is honoured between stages only; a running build step is
//! never interrupted by it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::build::{BuildContext, StepOutput, run_build_steps_with_timeout};
use crate::error::{InstallError, PipelineFailure, Stage};
use crate::fetch::fetch_source;
use crate::formula::FormulaDescriptor;
use crate::host::{ConstraintReport, HostCapabilities, check_constraints};
use crate::install::{FormulaResolver, InstallReport, Prefix, Receipt, install_artifacts};
use crate::util::hash::ContentHash;
use crate::verify::{VerificationStatus, VerifyReport, verify_install};

/// Caller-controlled knobs for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
  pub prefix: Prefix,
  /// Parent directory for per-install scratch directories.
  pub scratch_root: PathBuf,
  /// Wall-clock limit for the whole build stage.
  pub build_timeout: Option<Duration>,
  /// Keep the scratch directory when the build fails.
  pub keep_scratch: bool,
  pub skip_verify: bool,
  /// Checked before every stage.
  pub cancel: Option<CancellationToken>,
  /// Held for the duration of the install stage only.
  pub install_gate: Option<Arc<Mutex<()>>>,
}

impl PipelineOptions {
  pub fn new(prefix: Prefix, scratch_root: impl Into<PathBuf>) -> Self {
    Self {
      prefix,
      scratch_root: scratch_root.into(),
      build_timeout: None,
      keep_scratch: false,
      skip_verify: false,
      cancel: None,
      install_gate: None,
    }
  }

  pub fn with_build_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.build_timeout = timeout;
    self
  }

  pub fn with_keep_scratch(mut self, keep: bool) -> Self {
    self.keep_scratch = keep;
    self
  }

  pub fn with_skip_verify(mut self, skip: bool) -> Self {
    self.skip_verify = skip;
    self
  }

  pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
    self.cancel = Some(token);
    self
  }

  pub fn with_install_gate(mut self, gate: Arc<Mutex<()>>) -> Self {
    self.install_gate = Some(gate);
    self
  }

  fn checkpoint(&self, stage: Stage) -> Result<(), PipelineFailure> {
    if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
      info!(stage = %stage, "cancelled before stage");
      return Err(PipelineFailure::new(stage, InstallError::Cancelled));
    }
    Ok(())
  }
}

/// Everything a successful run produced.
#[derive(Debug, Clone, Serialize)]
pub struct InstallOutcome {
  pub name: String,
  pub version: String,
  pub constraints: ConstraintReport,
  pub archive_sha256: ContentHash,
  pub steps: Vec<StepOutput>,
  pub installed: InstallReport,
  pub verification: VerifyReport,
  pub receipt: PathBuf,
}

impl InstallOutcome {
  /// Terminal state: `verified`, or `installed` when verification was skipped.
  pub fn state(&self) -> &'static str {
    match self.verification.status {
      VerificationStatus::Passed => "verified",
      _ => "installed",
    }
  }
}

fn at(stage: Stage) -> impl FnOnce(InstallError) -> PipelineFailure {
  move |error| PipelineFailure::new(stage, error)
}

/// Run every stage for `descriptor`.
pub async fn install(
  descriptor: &FormulaDescriptor,
  host: &HostCapabilities,
  options: &PipelineOptions,
) -> Result<InstallOutcome, PipelineFailure> {
  let id = descriptor.id();
  info!(formula = %id, prefix = ?options.prefix.root(), "starting install");

  options.checkpoint(Stage::Constraints)?;
  let constraints = check_constraints(descriptor, host)
    .into_result()
    .map_err(at(Stage::Constraints))?;

  options.checkpoint(Stage::Fetch)?;
  let fetched = fetch_source(
    &descriptor.source_url,
    &descriptor.integrity_hash,
    &options.scratch_root,
    &id,
  )
  .await
  .map_err(at(Stage::Fetch))?;

  // Dropping `fetched` from here on removes the scratch directory.
  options.checkpoint(Stage::Build)?;
  let build_path = fetched.build_path().to_path_buf();
  let tmp_dir = fetched.scratch.tmp_dir();
  let resolver = FormulaResolver::for_descriptor(descriptor, &options.prefix).with_build_path(&build_path);
  let built = run_build_steps_with_timeout(
    &descriptor.build_steps,
    BuildContext {
      build_path: &build_path,
      tmp_dir: &tmp_dir,
    },
    &resolver,
    options.build_timeout,
  )
  .await;

  let steps = match built {
    Ok(steps) => steps,
    Err(error) => {
      if options.keep_scratch {
        let kept = fetched.scratch.keep();
        warn!(formula = %id, path = ?kept, "build failed, keeping scratch directory");
      }
      return Err(PipelineFailure::new(Stage::Build, error));
    }
  };

  options.checkpoint(Stage::Install)?;
  let installed = {
    let _gate = match &options.install_gate {
      Some(gate) => Some(gate.lock().await),
      None => None,
    };
    let mappings = descriptor.install_mappings.clone();
    let prefix = options.prefix.clone();
    let source = build_path.clone();
    tokio::task::spawn_blocking(move || install_artifacts(&mappings, &source, &prefix))
      .await
      .map_err(|e| InstallError::Io(std::io::Error::other(e)))
      .and_then(|r| r)
      .map_err(at(Stage::Install))?
  };
  let archive_sha256 = fetched.archive_hash.clone();
  drop(fetched);

  if let Err(cancelled) = options.checkpoint(Stage::Verify) {
    // The files are already in the prefix; record them so they can be removed.
    let status = VerificationStatus::Failed {
      reason: cancelled.error.to_string(),
    };
    write_receipt(descriptor, &installed, status, &options.prefix)?;
    return Err(cancelled);
  }

  let resolver = FormulaResolver::for_descriptor(descriptor, &options.prefix);
  let verified = if options.skip_verify {
    Ok(VerifyReport {
      status: VerificationStatus::Skipped,
      command: None,
      output: String::new(),
    })
  } else {
    verify_install(descriptor.test_command.as_ref(), &options.prefix, &resolver).await
  };

  let status = match &verified {
    Ok(report) => report.status.clone(),
    Err(error) => VerificationStatus::Failed {
      reason: error.to_string(),
    },
  };
  let receipt = write_receipt(descriptor, &installed, status, &options.prefix)?;
  let verification = verified.map_err(at(Stage::Verify))?;

  info!(formula = %id, files = installed.files.len(), status = verification.status.as_str(), "install complete");

  Ok(InstallOutcome {
    name: descriptor.name.clone(),
    version: descriptor.version.to_string(),
    constraints,
    archive_sha256,
    steps,
    installed,
    verification,
    receipt,
  })
}

fn write_receipt(
  descriptor: &FormulaDescriptor,
  installed: &InstallReport,
  status: VerificationStatus,
  prefix: &Prefix,
) -> Result<PathBuf, PipelineFailure> {
  Receipt::new(descriptor, installed.files.clone(), status)
    .write(prefix)
    .map_err(|e| PipelineFailure::new(Stage::Verify, InstallError::Io(std::io::Error::other(e))))
}
