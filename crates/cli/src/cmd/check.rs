use anyhow::{Context, Result, bail};

use pour_lib::host::{ConstraintOutcome, HostCapabilities, check_constraints};

use super::{GlobalArgs, resolve_formula};
use crate::output::{OutputFormat, print_error, print_info, print_json, print_stat, print_success, print_warning};

pub fn cmd_check(global: &GlobalArgs, reference: &str, output: OutputFormat) -> Result<()> {
  let config = global.config()?;
  let descriptor = resolve_formula(&config, reference)?;

  let rt = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
  let host = rt.block_on(HostCapabilities::detect(&descriptor));
  let report = check_constraints(&descriptor, &host);

  if output.is_json() {
    print_json(&serde_json::json!({
      "formula": descriptor.id(),
      "host": host,
      "satisfied": report.is_satisfied(),
      "outcomes": report.outcomes,
    }))?;
  } else {
    print_info(&format!("Checking {}", descriptor.id()));
    let os = host.os.map(|os| os.as_str()).unwrap_or("unknown");
    match &host.os_version {
      Some(version) => print_stat("Host", &format!("{} {}", os, version)),
      None => print_stat("Host", os),
    }
    println!();

    if report.outcomes.is_empty() {
      print_success("No dependencies");
    }
    for outcome in &report.outcomes {
      let line = describe_outcome(outcome);
      if outcome.satisfied {
        print_success(&line);
      } else if outcome.is_fatal() {
        print_error(&line);
      } else {
        print_warning(&line);
      }
    }
  }

  if !report.is_satisfied() {
    bail!("{} has unmet build dependencies", descriptor.id());
  }
  Ok(())
}

/// `xcode (build) >= 10.0, found 9.4`
pub(super) fn describe_outcome(outcome: &ConstraintOutcome) -> String {
  let dependency = &outcome.dependency;
  let mut line = format!("{} ({})", dependency.name, dependency.phase);
  if let Some(min) = &dependency.min_version {
    line.push_str(&format!(" >= {}", min));
  }
  match &outcome.found {
    Some(found) => line.push_str(&format!(", found {}", found)),
    None if !outcome.satisfied => line.push_str(", not found"),
    None => {}
  }
  line
}
