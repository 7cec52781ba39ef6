use std::time::Instant;

use anyhow::{Context, Result};

use pour_lib::fetch::fetch_only;

use super::{GlobalArgs, resolve_formula};
use crate::output::{OutputFormat, format_bytes, format_duration, print_json, print_stat, print_success};

pub fn cmd_fetch(global: &GlobalArgs, reference: &str, output: OutputFormat) -> Result<()> {
  let start = Instant::now();
  let config = global.config()?;
  let descriptor = resolve_formula(&config, reference)?;

  let rt = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
  let summary = rt
    .block_on(fetch_only(&descriptor.source_url, &descriptor.integrity_hash))
    .with_context(|| format!("Failed to fetch {}", descriptor.id()))?;

  if output.is_json() {
    print_json(&summary)?;
  } else {
    print_success(&format!("Fetched {}", descriptor.id()));
    print_stat("URL", &summary.url);
    print_stat("SHA-256", summary.sha256.as_str());
    print_stat("Size", &format_bytes(summary.size as u64));
    print_stat("Duration", &format_duration(start.elapsed()));
  }

  Ok(())
}
