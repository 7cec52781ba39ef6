//! Info command implementation.
//!
//! Shows a formula's descriptor, the versions known to the formula directory
//! and whether it is installed in the prefix.

use anyhow::Result;
use tracing::debug;

use pour_lib::formula::BuildStep;
use pour_lib::install::Receipt;
use pour_lib::registry::Registry;

use super::{GlobalArgs, resolve_formula};
use crate::output::{self, OutputFormat, print_info, print_json, print_stat, truncate_hash};

pub fn cmd_info(global: &GlobalArgs, reference: &str, output: OutputFormat) -> Result<()> {
  let config = global.config()?;
  let descriptor = resolve_formula(&config, reference)?;

  let mut versions: Vec<String> = match Registry::load(&config.formula_dir) {
    Ok(registry) => registry.versions(&descriptor.name).into_iter().map(ToString::to_string).collect(),
    Err(e) => {
      debug!(error = %e, "formula directory unavailable, showing only the given formula");
      Vec::new()
    }
  };
  if versions.is_empty() {
    versions.push(descriptor.version.to_string());
  }

  let receipt = Receipt::load(&config.prefix(), &descriptor.name)?;

  if output.is_json() {
    print_json(&serde_json::json!({
      "formula": descriptor,
      "versions": versions,
      "installed": receipt,
    }))?;
    return Ok(());
  }

  print_info(&format!("{} {}", descriptor.name, descriptor.version));
  if let Some(description) = &descriptor.description {
    println!("  {}", description);
  }
  println!();
  if let Some(homepage) = &descriptor.homepage {
    print_stat("Homepage", homepage);
  }
  if let Some(license) = &descriptor.license {
    print_stat("License", license);
  }
  print_stat("Source", &descriptor.source_url);
  print_stat("SHA-256", truncate_hash(descriptor.integrity_hash.as_str()));
  print_stat("Versions", &versions.join(", "));

  if !descriptor.dependencies.is_empty() {
    println!();
    println!("Dependencies:");
    for dep in &descriptor.dependencies {
      match &dep.min_version {
        Some(min) => println!("  {} {} >= {} ({})", output::symbols::INFO, dep.name, min, dep.phase),
        None => println!("  {} {} ({})", output::symbols::INFO, dep.name, dep.phase),
      }
    }
  }

  println!();
  println!("Build:");
  for (index, step) in descriptor.build_steps.iter().enumerate() {
    match step {
      BuildStep::Run(cmd) => println!("  {}. {} {}", index, cmd.program, cmd.args.join(" ")),
      BuildStep::Mkdir { path } => println!("  {}. mkdir {}", index, path),
    }
  }

  println!();
  println!("Installs:");
  for mapping in &descriptor.install_mappings {
    let dest = match &mapping.rename {
      Some(rename) => format!("{}/{}", mapping.category, rename),
      None => mapping.category.to_string(),
    };
    println!(
      "  {} {} {} {}",
      output::symbols::INFO,
      mapping.built_path,
      output::symbols::ARROW,
      dest
    );
  }

  if let Some(test) = &descriptor.test_command {
    println!();
    print_stat("Test", &test.display());
  }

  println!();
  match receipt {
    Some(receipt) => print_stat(
      "Installed",
      &format!("{} ({})", receipt.version, receipt.verification.as_str()),
    ),
    None => print_stat("Installed", "no"),
  }

  Ok(())
}
