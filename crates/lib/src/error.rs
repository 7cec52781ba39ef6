//! Error taxonomy for the install pipeline.
//!
//! Every stage fails closed: the first error halts the pipeline and is
//! surfaced together with the [`Stage`] it happened in.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::formula::Category;
use crate::placeholder::PlaceholderError;

/// A dependency that the host does not satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmetDependency {
  pub name: String,
  /// Minimum version requested by the formula, if any.
  pub required: Option<String>,
  /// Version found on the host, `None` when the tool is missing entirely.
  pub found: Option<String>,
}

impl fmt::Display for UnmetDependency {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name)?;
    if let Some(required) = &self.required {
      write!(f, " >= {}", required)?;
    }
    match &self.found {
      Some(found) => write!(f, " (found {})", found),
      None => write!(f, " (not found)"),
    }
  }
}

/// Errors raised by the pipeline stages.
#[derive(Debug, Error)]
pub enum InstallError {
  /// A required field is missing or ill-formed.
  #[error("malformed descriptor: {reason}")]
  MalformedDescriptor { reason: String },

  /// A dependency phase or destination category outside the known set.
  #[error("unsupported {field} '{value}'")]
  UnsupportedConstraint { field: &'static str, value: String },

  /// One or more build-phase dependencies are unmet.
  #[error("unmet build dependencies: {}", join_unmet(.unmet))]
  UnmetBuildDependency { unmet: Vec<UnmetDependency> },

  /// Download or extraction failed.
  #[error("fetch failed for {url}: {message}")]
  FetchFailed { url: String, message: String },

  /// SHA-256 of the downloaded archive differs from the declared one.
  #[error("integrity mismatch for {url}: expected {expected}, got {actual}")]
  IntegrityMismatch {
    url: String,
    expected: String,
    actual: String,
  },

  /// A build step exited non-zero or could not be spawned.
  #[error("build step {step_index} ({program}) failed with exit code {exit_code:?}")]
  BuildStepFailed {
    step_index: usize,
    program: String,
    exit_code: Option<i32>,
    output: String,
  },

  /// The caller-imposed build timeout elapsed.
  #[error("build did not finish within {}", humantime::format_duration(*.timeout))]
  BuildTimedOut { timeout: Duration },

  /// An install mapping refers to a path the build did not produce.
  #[error("build did not produce '{built_path}' (for {category})")]
  MissingBuildArtifact {
    built_path: String,
    category: Category,
    /// Files already installed by earlier mappings. They are left in place.
    installed: Vec<PathBuf>,
  },

  /// The test command failed against the installed artifact.
  #[error("post-install verification failed: `{command}`: {reason}")]
  PostInstallVerificationFailed {
    command: String,
    exit_code: Option<i32>,
    output: String,
    reason: String,
  },

  /// Cancelled between stages.
  #[error("install cancelled")]
  Cancelled,

  #[error("placeholder error: {0}")]
  Placeholder(#[from] PlaceholderError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl InstallError {
  /// Captured diagnostic output for build and verify failures.
  pub fn captured_output(&self) -> Option<&str> {
    match self {
      InstallError::BuildStepFailed { output, .. } | InstallError::PostInstallVerificationFailed { output, .. } => {
        Some(output)
      }
      _ => None,
    }
  }

  pub(crate) fn malformed(reason: impl Into<String>) -> Self {
    InstallError::MalformedDescriptor { reason: reason.into() }
  }
}

fn join_unmet(unmet: &[UnmetDependency]) -> String {
  unmet.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// One sequential phase of the install pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
  Descriptor,
  Constraints,
  Fetch,
  Build,
  Install,
  Verify,
}

impl Stage {
  pub fn as_str(&self) -> &'static str {
    match self {
      Stage::Descriptor => "descriptor",
      Stage::Constraints => "constraints",
      Stage::Fetch => "fetch",
      Stage::Build => "build",
      Stage::Install => "install",
      Stage::Verify => "verify",
    }
  }
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A pipeline error together with the stage that raised it.
#[derive(Debug, Error)]
#[error("failed at stage {stage}: {error}")]
pub struct PipelineFailure {
  pub stage: Stage,
  #[source]
  pub error: InstallError,
}

impl PipelineFailure {
  pub fn new(stage: Stage, error: InstallError) -> Self {
    Self { stage, error }
  }
}
