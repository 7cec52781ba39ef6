//! Host capability snapshot and constraint checking.
//!
//! A [`HostCapabilities`] snapshot records the OS, its version and the
//! versions of the toolchains a formula depends on. [`check_constraints`]
//! evaluates a descriptor's dependencies against a snapshot.

mod check;
pub mod os;

use std::collections::BTreeMap;

use serde::Serialize;
use tokio::process::Command;
use tracing::debug;

use crate::formula::{FormulaDescriptor, Version};

pub use check::{ConstraintOutcome, ConstraintReport, Severity, check_constraints};
pub use os::Os;

/// What the host provides, captured once before checking constraints.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HostCapabilities {
  pub os: Option<Os>,
  pub os_version: Option<Version>,
  /// Detected toolchain versions keyed by dependency name.
  pub tools: BTreeMap<String, Version>,
}

impl HostCapabilities {
  pub fn new(os: Os) -> Self {
    Self {
      os: Some(os),
      ..Self::default()
    }
  }

  pub fn with_os_version(mut self, version: Version) -> Self {
    self.os_version = Some(version);
    self
  }

  pub fn with_tool(mut self, name: &str, version: Version) -> Self {
    self.tools.insert(name.to_string(), version);
    self
  }

  pub fn tool_version(&self, name: &str) -> Option<&Version> {
    self.tools.get(name)
  }

  /// Detect the current host, probing only the tools `descriptor` depends on.
  pub async fn detect(descriptor: &FormulaDescriptor) -> Self {
    let mut host = Self {
      os: Os::current(),
      os_version: sysinfo::System::os_version().as_deref().and_then(Version::extract),
      tools: BTreeMap::new(),
    };

    for dep in &descriptor.dependencies {
      if Os::from_dependency(&dep.name).is_some() || host.tools.contains_key(&dep.name) {
        continue;
      }
      if let Some(version) = tool_version(&dep.name).await {
        host.tools.insert(dep.name.clone(), version);
      }
    }

    debug!(os = ?host.os, os_version = ?host.os_version, tools = ?host.tools, "detected host");
    host
  }
}

const XCODE_VERSION_ARGS: &[&str] = &["-version"];
const DEFAULT_VERSION_ARGS: &[&str] = &["--version"];

/// Command used to ask a tool for its version.
fn version_command(tool: &str) -> (&str, &'static [&'static str]) {
  match tool {
    "xcode" => ("xcodebuild", XCODE_VERSION_ARGS),
    other => (other, DEFAULT_VERSION_ARGS),
  }
}

/// Run the tool's version command and pull the first version out of its output.
///
/// Missing tools and non-zero exits both count as "not installed".
pub async fn tool_version(tool: &str) -> Option<Version> {
  let (program, args) = version_command(tool);
  let output = match Command::new(program).args(args).output().await {
    Ok(output) => output,
    Err(e) => {
      debug!(tool = %tool, error = %e, "tool not found");
      return None;
    }
  };

  if !output.status.success() {
    debug!(tool = %tool, code = ?output.status.code(), "version check failed");
    return None;
  }

  let text = format!(
    "{}\n{}",
    String::from_utf8_lossy(&output.stdout),
    String::from_utf8_lossy(&output.stderr)
  );
  let version = Version::extract(&text);
  debug!(tool = %tool, version = ?version, "detected tool version");
  version
}
