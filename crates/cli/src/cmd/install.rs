//! Install command implementation.
//!
//! Runs one pipeline per formula concurrently under an exclusive prefix lock.
//! Installs into the prefix are serialized through a shared gate; Ctrl-C
//! cancels every pipeline at its next stage boundary.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::info;

use pour_lib::error::PipelineFailure;
use pour_lib::host::HostCapabilities;
use pour_lib::pipeline::{self, InstallOutcome, PipelineOptions};
use pour_lib::prefix_lock::{LockMode, PrefixLock};

use super::check::describe_outcome;
use super::{GlobalArgs, resolve_formula};
use crate::output::{
  OutputFormat, format_duration, print_captured, print_error, print_json, print_stat, print_success, print_warning,
};

pub struct InstallArgs {
  pub build_timeout: Option<Duration>,
  pub keep_scratch: bool,
  pub skip_verify: bool,
}

pub fn cmd_install(global: &GlobalArgs, formulas: &[String], args: InstallArgs, output: OutputFormat) -> Result<()> {
  let start = Instant::now();
  let config = global.config()?;

  let descriptors = formulas
    .iter()
    .map(|reference| resolve_formula(&config, reference))
    .collect::<Result<Vec<_>>>()?;

  let prefix = config.prefix();
  let _lock = PrefixLock::acquire(&prefix, LockMode::Exclusive, "install").context("Failed to acquire prefix lock")?;

  let cancel = CancellationToken::new();
  let options = PipelineOptions::new(prefix, &config.scratch_dir)
    .with_build_timeout(args.build_timeout.or(config.build_timeout))
    .with_keep_scratch(args.keep_scratch || config.keep_scratch)
    .with_skip_verify(args.skip_verify)
    .with_cancellation(cancel.clone())
    .with_install_gate(Arc::new(Mutex::new(())));

  let rt = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
  let results = rt.block_on(async {
    let interrupt = cancel.clone();
    tokio::spawn(async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        info!("interrupted, cancelling after the current stage");
        interrupt.cancel();
      }
    });

    let mut set = JoinSet::new();
    for (index, descriptor) in descriptors.into_iter().enumerate() {
      let options = options.clone();
      set.spawn(async move {
        let host = HostCapabilities::detect(&descriptor).await;
        let result = pipeline::install(&descriptor, &host, &options).await;
        (index, descriptor.id(), result)
      });
    }

    let mut results = Vec::with_capacity(set.len());
    while let Some(joined) = set.join_next().await {
      results.push(joined.context("Install task panicked")?);
    }
    results.sort_by_key(|(index, ..)| *index);
    Ok::<_, anyhow::Error>(results)
  })?;

  let failed = results.iter().filter(|(_, _, result)| result.is_err()).count();

  if output.is_json() {
    let items: Vec<_> = results
      .iter()
      .map(|(_, id, result)| match result {
        Ok(outcome) => serde_json::json!({ "formula": id, "state": outcome.state(), "outcome": outcome }),
        Err(failure) => serde_json::json!({
          "formula": id,
          "state": "failed",
          "stage": failure.stage,
          "error": failure.error.to_string(),
          "output": failure.error.captured_output(),
        }),
      })
      .collect();
    print_json(&items)?;
  } else {
    for (_, id, result) in &results {
      match result {
        Ok(outcome) => print_outcome(id, outcome),
        Err(failure) => print_failure(id, failure),
      }
    }
    println!();
    print_stat("Duration", &format_duration(start.elapsed()));
  }

  if failed > 0 {
    bail!("{} of {} installs failed", failed, results.len());
  }
  Ok(())
}

fn print_outcome(id: &str, outcome: &InstallOutcome) {
  print_success(&format!("{} {}", id, outcome.state()));
  print_stat("Files", &outcome.installed.files.len().to_string());
  print_stat("Build steps", &outcome.steps.len().to_string());
  print_stat("Receipt", &outcome.receipt.display().to_string());
  for advisory in outcome.constraints.advisories() {
    print_warning(&format!("runtime dependency not satisfied: {}", describe_outcome(advisory)));
  }
}

fn print_failure(id: &str, failure: &PipelineFailure) {
  print_error(&format!("{} failed at stage {}: {}", id, failure.stage, failure.error));
  if let Some(captured) = failure.error.captured_output() {
    print_captured(captured);
  }
}
