use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::formula::version::Version;
use crate::util::hash::ContentHash;

/// A parsed formula: everything needed to fetch, build, install and test one
/// version of one package.
///
/// Descriptors are never mutated after parsing. Two versions of the same
/// package are two independent descriptors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormulaDescriptor {
  pub name: String,
  pub version: Version,
  pub description: Option<String>,
  pub homepage: Option<String>,
  pub license: Option<String>,
  pub source_url: String,
  pub integrity_hash: ContentHash,
  pub dependencies: Vec<Dependency>,
  pub build_steps: Vec<BuildStep>,
  pub install_mappings: Vec<InstallMapping>,
  pub test_command: Option<TestCommand>,
}

impl FormulaDescriptor {
  /// `name@version`, used in logs and scratch directory names.
  pub fn id(&self) -> String {
    format!("{}@{}", self.name, self.version)
  }
}

/// When a dependency must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
  /// Needed to build; unmet is fatal.
  Build,
  /// Needed to run; unmet is advisory at install time.
  Runtime,
}

impl FromStr for Phase {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "build" => Ok(Phase::Build),
      "runtime" => Ok(Phase::Runtime),
      other => Err(other.to_string()),
    }
  }
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Phase::Build => f.write_str("build"),
      Phase::Runtime => f.write_str("runtime"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dependency {
  pub name: String,
  pub min_version: Option<Version>,
  pub phase: Phase,
}

/// An external command with explicit arguments (no shell involved).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
  pub program: String,
  pub args: Vec<String>,
  /// Environment overrides layered over the build environment.
  pub env: BTreeMap<String, String>,
  /// Working directory relative to the build path.
  pub cwd: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStep {
  Run(CommandSpec),
  /// Create a directory (and parents) relative to the build path.
  Mkdir { path: String },
}

impl BuildStep {
  /// Short label for logs and error messages.
  pub fn label(&self) -> &str {
    match self {
      BuildStep::Run(cmd) => &cmd.program,
      BuildStep::Mkdir { .. } => "mkdir",
    }
  }
}

/// Conventional install destination under the prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
  Bin,
  Sbin,
  Lib,
  Libexec,
  Include,
  Share,
  Etc,
  /// Manual page section 1-8.
  Man(u8),
}

impl Category {
  /// Every category, in prefix layout order.
  pub fn all() -> impl Iterator<Item = Category> {
    [
      Category::Bin,
      Category::Sbin,
      Category::Lib,
      Category::Libexec,
      Category::Include,
      Category::Share,
      Category::Etc,
    ]
    .into_iter()
    .chain((1..=8).map(Category::Man))
  }

  /// Directory relative to the prefix root.
  pub fn relative_dir(&self) -> PathBuf {
    match self {
      Category::Bin => PathBuf::from("bin"),
      Category::Sbin => PathBuf::from("sbin"),
      Category::Lib => PathBuf::from("lib"),
      Category::Libexec => PathBuf::from("libexec"),
      Category::Include => PathBuf::from("include"),
      Category::Share => PathBuf::from("share"),
      Category::Etc => PathBuf::from("etc"),
      Category::Man(section) => PathBuf::from("share").join("man").join(format!("man{}", section)),
    }
  }

  /// Whether installed files get the executable bit.
  pub fn is_executable(&self) -> bool {
    matches!(self, Category::Bin | Category::Sbin | Category::Libexec)
  }
}

impl FromStr for Category {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "bin" | "binary" => Ok(Category::Bin),
      "sbin" => Ok(Category::Sbin),
      "lib" => Ok(Category::Lib),
      "libexec" => Ok(Category::Libexec),
      "include" => Ok(Category::Include),
      "share" => Ok(Category::Share),
      "etc" => Ok(Category::Etc),
      other => other
        .strip_prefix("man")
        .and_then(|section| section.parse::<u8>().ok())
        .filter(|section| (1..=8).contains(section))
        .map(Category::Man)
        .ok_or_else(|| other.to_string()),
    }
  }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Category::Bin => f.write_str("bin"),
      Category::Sbin => f.write_str("sbin"),
      Category::Lib => f.write_str("lib"),
      Category::Libexec => f.write_str("libexec"),
      Category::Include => f.write_str("include"),
      Category::Share => f.write_str("share"),
      Category::Etc => f.write_str("etc"),
      Category::Man(section) => write!(f, "man{}", section),
    }
  }
}

impl Serialize for Category {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for Category {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    Category::from_str(&s).map_err(|v| serde::de::Error::custom(format!("unknown category '{}'", v)))
  }
}

/// Copy `built_path` (relative to the build path) into `category`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallMapping {
  pub built_path: String,
  pub category: Category,
  /// Destination file name; defaults to the source file name.
  pub rename: Option<String>,
}

/// Post-install smoke test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCommand {
  pub program: String,
  pub args: Vec<String>,
  /// Substring the combined output must contain.
  pub expect: Option<String>,
}

impl TestCommand {
  /// Unresolved command line for display.
  pub fn display(&self) -> String {
    std::iter::once(self.program.as_str())
      .chain(self.args.iter().map(String::as_str))
      .collect::<Vec<_>>()
      .join(" ")
  }
}
