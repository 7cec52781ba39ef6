mod cmd;
mod output;
mod prompts;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd::GlobalArgs;
use crate::output::OutputFormat;

/// pour - build and install packages from formulas
#[derive(Parser)]
#[command(name = "pour")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Install prefix (overrides config and POUR_PREFIX)
  #[arg(long, global = true)]
  prefix: Option<PathBuf>,

  /// Directory of formula files (overrides config and POUR_FORMULA_PATH)
  #[arg(long, global = true)]
  formula_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Fetch, build, install and verify one or more formulas
  Install {
    /// Formula names (`name` or `name@version`) or paths to formula files
    #[arg(required = true)]
    formulas: Vec<String>,

    /// Abort a build that runs longer than this (e.g. "30m")
    #[arg(long)]
    build_timeout: Option<humantime::Duration>,

    /// Keep the scratch directory when a build fails
    #[arg(long)]
    keep_scratch: bool,

    /// Do not run the formula's test command
    #[arg(long)]
    skip_verify: bool,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
  },

  /// Check a formula's dependencies against this host
  Check {
    formula: String,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
  },

  /// Download and verify a formula's source archive
  Fetch {
    formula: String,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
  },

  /// Show a formula and its known versions
  Info {
    formula: String,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
  },

  /// List installed formulas
  List {
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
  },

  /// Re-run the test command of an installed formula
  Test { name: String },

  /// Remove an installed formula's files
  Uninstall {
    name: String,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    force: bool,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_filter = if cli.verbose {
    "pour=debug,pour_lib=debug"
  } else {
    "pour=info,pour_lib=info"
  };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let global = GlobalArgs {
    prefix: cli.prefix,
    formula_dir: cli.formula_dir,
  };

  match cli.command {
    Commands::Install {
      formulas,
      build_timeout,
      keep_scratch,
      skip_verify,
      output,
    } => cmd::cmd_install(
      &global,
      &formulas,
      cmd::InstallArgs {
        build_timeout: build_timeout.map(Into::into),
        keep_scratch,
        skip_verify,
      },
      output,
    ),
    Commands::Check { formula, output } => cmd::cmd_check(&global, &formula, output),
    Commands::Fetch { formula, output } => cmd::cmd_fetch(&global, &formula, output),
    Commands::Info { formula, output } => cmd::cmd_info(&global, &formula, output),
    Commands::List { output } => cmd::cmd_list(&global, output),
    Commands::Test { name } => cmd::cmd_test(&global, &name),
    Commands::Uninstall { name, force } => cmd::cmd_uninstall(&global, &name, force),
  }
}
