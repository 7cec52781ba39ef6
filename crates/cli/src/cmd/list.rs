use anyhow::{Context, Result};

use pour_lib::install::Receipt;
use pour_lib::prefix_lock::{LockMode, PrefixLock};

use super::GlobalArgs;
use crate::output::{self, OutputFormat, print_info, print_json, print_stat};

pub fn cmd_list(global: &GlobalArgs, output: OutputFormat) -> Result<()> {
  let config = global.config()?;
  let prefix = config.prefix();

  let _lock = PrefixLock::acquire(&prefix, LockMode::Shared, "list").context("Failed to acquire prefix lock")?;
  let receipts = Receipt::list(&prefix).context("Failed to read install receipts")?;

  if output.is_json() {
    print_json(&receipts)?;
    return Ok(());
  }

  if receipts.is_empty() {
    print_info(&format!("Nothing installed in {}", prefix.root().display()));
    return Ok(());
  }

  for receipt in &receipts {
    println!(
      "  {} {} {} ({}, {} files)",
      output::symbols::INFO,
      receipt.name,
      receipt.version,
      receipt.verification.as_str(),
      receipt.files.len()
    );
  }
  println!();
  print_stat("Installed", &receipts.len().to_string());

  Ok(())
}
