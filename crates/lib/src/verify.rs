//! Post-install verification.
//!
//! Runs the formula's test command against the installed files. The command
//! runs in a throwaway directory with the prefix's `bin/` first on `PATH`, so
//! `hear --version` finds the freshly installed binary.

use std::ffi::OsString;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::build::combine_output;
use crate::error::InstallError;
use crate::formula::{Category, TestCommand};
use crate::install::Prefix;
use crate::placeholder::{Resolver, substitute};

/// Outcome recorded in the install receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum VerificationStatus {
  Passed,
  Skipped,
  Failed { reason: String },
}

impl VerificationStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      VerificationStatus::Passed => "passed",
      VerificationStatus::Skipped => "skipped",
      VerificationStatus::Failed { .. } => "failed",
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
  pub status: VerificationStatus,
  /// Resolved command line, absent when skipped.
  pub command: Option<String>,
  pub output: String,
}

/// Run `test` against the installed prefix.
///
/// `None` yields a skipped report. Failures are returned as
/// `PostInstallVerificationFailed`; nothing is uninstalled.
pub async fn verify_install(
  test: Option<&TestCommand>,
  prefix: &Prefix,
  resolver: &impl Resolver,
) -> Result<VerifyReport, InstallError> {
  let Some(test) = test else {
    debug!("no test command, skipping verification");
    return Ok(VerifyReport {
      status: VerificationStatus::Skipped,
      command: None,
      output: String::new(),
    });
  };

  let program = substitute(&test.program, resolver)?;
  let args = test
    .args
    .iter()
    .map(|arg| substitute(arg, resolver))
    .collect::<Result<Vec<_>, _>>()?;
  let expect = test.expect.as_deref().map(|e| substitute(e, resolver)).transpose()?;
  let command_line = std::iter::once(program.as_str())
    .chain(args.iter().map(String::as_str))
    .collect::<Vec<_>>()
    .join(" ");

  let workdir = tempfile::Builder::new().prefix("pour-verify-").tempdir()?;

  info!(command = %command_line, "verifying install");

  let output = Command::new(&program)
    .args(&args)
    .current_dir(workdir.path())
    .env("PATH", search_path(prefix)?)
    .stdin(Stdio::null())
    .kill_on_drop(true)
    .output()
    .await;

  let failed = |exit_code: Option<i32>, output: String, reason: String| {
    warn!(command = %command_line, reason = %reason, "verification failed");
    InstallError::PostInstallVerificationFailed {
      command: command_line.clone(),
      exit_code,
      output,
      reason,
    }
  };

  let output = match output {
    Ok(output) => output,
    Err(e) => return Err(failed(None, String::new(), format!("failed to spawn: {}", e))),
  };

  let captured = combine_output(&output.stdout, &output.stderr);
  let exit_code = output.status.code();

  if !output.status.success() {
    let reason = match exit_code {
      Some(code) => format!("exited with status {}", code),
      None => "terminated by signal".to_string(),
    };
    return Err(failed(exit_code, captured, reason));
  }

  if let Some(expect) = &expect
    && !captured.contains(expect.as_str())
  {
    return Err(failed(exit_code, captured, format!("output did not contain '{}'", expect)));
  }

  info!(command = %command_line, "verification passed");
  Ok(VerifyReport {
    status: VerificationStatus::Passed,
    command: Some(command_line),
    output: captured,
  })
}

/// `<prefix>/bin` followed by the current `PATH`.
fn search_path(prefix: &Prefix) -> Result<OsString, InstallError> {
  let mut paths = vec![prefix.category_dir(Category::Bin)];
  if let Some(existing) = std::env::var_os("PATH") {
    paths.extend(std::env::split_paths(&existing));
  }
  std::env::join_paths(paths).map_err(|e| InstallError::Io(std::io::Error::other(e)))
}
