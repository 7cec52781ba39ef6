use anyhow::{Context, Result, anyhow};

use pour_lib::install::{Receipt, uninstall};
use pour_lib::prefix_lock::{LockMode, PrefixLock};

use super::GlobalArgs;
use crate::output::{print_info, print_stat, print_success, print_warning};
use crate::prompts::confirm_removal;

pub fn cmd_uninstall(global: &GlobalArgs, name: &str, force: bool) -> Result<()> {
  let config = global.config()?;
  let prefix = config.prefix();

  // Held across the prompt so the receipt cannot change before removal.
  let _lock = PrefixLock::acquire(&prefix, LockMode::Exclusive, "uninstall").context("Failed to acquire prefix lock")?;

  let receipt = Receipt::load(&prefix, name)?.ok_or_else(|| anyhow!("'{}' is not installed", name))?;
  if !confirm_removal(name, receipt.files.len(), prefix.root(), force)? {
    print_info("Aborted");
    return Ok(());
  }

  let report = uninstall(&prefix, name).with_context(|| format!("Failed to uninstall {}", name))?;

  print_success(&format!("Uninstalled {}", name));
  print_stat("Files removed", &report.removed.len().to_string());
  if !report.missing.is_empty() {
    print_stat("Already missing", &report.missing.len().to_string());
  }
  for path in &report.modified {
    print_warning(&format!("Kept {} (modified after install)", path.display()));
  }

  Ok(())
}
