//! Build step execution.
//!
//! Runs a descriptor's steps in order inside the extracted source tree. A
//! `run` step is an external program with an explicit argument list; there is
//! no shell in between. The first step that fails stops the build.

pub mod env;

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::InstallError;
use crate::formula::{BuildStep, CommandSpec};
use crate::placeholder::{PlaceholderError, Resolver, substitute};

/// Where a build runs.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
  /// Root of the extracted source tree; relative step paths resolve here.
  pub build_path: &'a Path,
  /// `TMPDIR` for every step.
  pub tmp_dir: &'a Path,
}

/// Captured result of one successful step.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutput {
  pub step_index: usize,
  pub program: String,
  pub exit_code: Option<i32>,
  pub output: String,
}

/// Run `steps` in order, stopping at the first failure.
pub async fn run_build_steps(
  steps: &[BuildStep],
  ctx: BuildContext<'_>,
  resolver: &impl Resolver,
) -> Result<Vec<StepOutput>, InstallError> {
  let mut outputs = Vec::with_capacity(steps.len());

  for (step_index, step) in steps.iter().enumerate() {
    let output = match step {
      BuildStep::Run(cmd) => run_command(step_index, cmd, ctx, resolver).await?,
      BuildStep::Mkdir { path } => make_dir(step_index, path, ctx, resolver).await?,
    };
    outputs.push(output);
  }

  Ok(outputs)
}

/// [`run_build_steps`] bounded by an optional wall-clock limit.
///
/// When the limit elapses the running child is killed and the remaining
/// steps are skipped.
pub async fn run_build_steps_with_timeout(
  steps: &[BuildStep],
  ctx: BuildContext<'_>,
  resolver: &impl Resolver,
  timeout: Option<Duration>,
) -> Result<Vec<StepOutput>, InstallError> {
  match timeout {
    Some(timeout) => tokio::time::timeout(timeout, run_build_steps(steps, ctx, resolver))
      .await
      .map_err(|_| InstallError::BuildTimedOut { timeout })?,
    None => run_build_steps(steps, ctx, resolver).await,
  }
}

/// A step that failed before (or without) running a process.
fn step_failed(step_index: usize, program: &str, error: impl std::fmt::Display) -> InstallError {
  InstallError::BuildStepFailed {
    step_index,
    program: program.to_string(),
    exit_code: None,
    output: error.to_string(),
  }
}

async fn make_dir(
  step_index: usize,
  path: &str,
  ctx: BuildContext<'_>,
  resolver: &impl Resolver,
) -> Result<StepOutput, InstallError> {
  let path = substitute(path, resolver).map_err(|e| step_failed(step_index, "mkdir", e))?;
  let dir = resolve_path(ctx.build_path, &path);
  debug!(step = step_index, path = ?dir, "creating directory");
  tokio::fs::create_dir_all(&dir)
    .await
    .map_err(|e| step_failed(step_index, "mkdir", format!("{}: {}", dir.display(), e)))?;

  Ok(StepOutput {
    step_index,
    program: "mkdir".to_string(),
    exit_code: Some(0),
    output: String::new(),
  })
}

async fn run_command(
  step_index: usize,
  cmd: &CommandSpec,
  ctx: BuildContext<'_>,
  resolver: &impl Resolver,
) -> Result<StepOutput, InstallError> {
  let fail = |e: PlaceholderError| step_failed(step_index, &cmd.program, e);
  let program = substitute(&cmd.program, resolver).map_err(fail)?;
  let args = cmd
    .args
    .iter()
    .map(|arg| substitute(arg, resolver))
    .collect::<Result<Vec<_>, _>>()
    .map_err(fail)?;

  let working_dir = match &cmd.cwd {
    Some(cwd) => resolve_path(ctx.build_path, &substitute(cwd, resolver).map_err(fail)?),
    None => ctx.build_path.to_path_buf(),
  };

  // `./configure` style programs are relative to the step's working directory.
  let executable = if program.contains('/') && Path::new(&program).is_relative() {
    working_dir.join(&program)
  } else {
    PathBuf::from(&program)
  };

  let mut command = Command::new(&executable);
  command
    .args(&args)
    .current_dir(&working_dir)
    .env_clear()
    .envs(env::base_environment(ctx.tmp_dir))
    .stdin(Stdio::null())
    .kill_on_drop(true);

  for (key, value) in &cmd.env {
    command.env(key, substitute(value, resolver).map_err(fail)?);
  }

  info!(step = step_index, program = %program, args = ?args, "running build step");
  debug!(working_dir = ?working_dir, "spawning process");

  let output = match command.output().await {
    Ok(output) => output,
    Err(e) => {
      return Err(InstallError::BuildStepFailed {
        step_index,
        program,
        exit_code: None,
        output: format!("failed to spawn: {}", e),
      });
    }
  };

  let captured = combine_output(&output.stdout, &output.stderr);
  if !captured.is_empty() {
    debug!(step = step_index, output = %captured, "step output");
  }

  if !output.status.success() {
    return Err(InstallError::BuildStepFailed {
      step_index,
      program,
      exit_code: output.status.code(),
      output: captured,
    });
  }

  Ok(StepOutput {
    step_index,
    program,
    exit_code: output.status.code(),
    output: captured,
  })
}

fn resolve_path(base: &Path, path: &str) -> PathBuf {
  let path = Path::new(path);
  if path.is_absolute() {
    path.to_path_buf()
  } else {
    base.join(path)
  }
}

pub(crate) fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
  let stdout = String::from_utf8_lossy(stdout);
  let stderr = String::from_utf8_lossy(stderr);
  match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
    (true, true) => String::new(),
    (false, true) => stdout.trim_end().to_string(),
    (true, false) => stderr.trim_end().to_string(),
    (false, false) => format!("{}\n{}", stdout.trim_end(), stderr.trim_end()),
  }
}
