mod check;
mod fetch;
mod info;
mod install;
mod list;
mod uninstall;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use pour_lib::config::Config;
use pour_lib::formula::FormulaDescriptor;
use pour_lib::registry::Registry;

pub use check::cmd_check;
pub use fetch::cmd_fetch;
pub use info::cmd_info;
pub use install::{InstallArgs, cmd_install};
pub use list::cmd_list;
pub use test::cmd_test;
pub use uninstall::cmd_uninstall;

/// Flags shared by every subcommand.
pub struct GlobalArgs {
  pub prefix: Option<PathBuf>,
  pub formula_dir: Option<PathBuf>,
}

impl GlobalArgs {
  /// Load the config file and environment, then apply command-line overrides.
  pub fn config(&self) -> Result<Config> {
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(prefix) = &self.prefix {
      config.prefix = prefix.clone();
    }
    if let Some(dir) = &self.formula_dir {
      config.formula_dir = dir.clone();
    }
    Ok(config)
  }
}

/// Resolve a formula reference: a path to a `.toml` file, or `name[@version]`
/// looked up in the formula directory.
pub fn resolve_formula(config: &Config, reference: &str) -> Result<FormulaDescriptor> {
  let path = Path::new(reference);
  if reference.ends_with(".toml") || path.is_file() {
    let path = dunce::canonicalize(path).with_context(|| format!("Formula file not found: {}", reference))?;
    return FormulaDescriptor::from_path(&path).with_context(|| format!("Failed to load formula {}", path.display()));
  }

  let registry = Registry::load(&config.formula_dir)
    .with_context(|| format!("Failed to load formulas from {}", config.formula_dir.display()))?;
  let descriptor = registry.resolve_reference(reference)?;
  Ok(descriptor.clone())
}
