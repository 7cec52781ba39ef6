//! Dependency constraint evaluation.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{InstallError, UnmetDependency};
use crate::formula::{Dependency, FormulaDescriptor, Phase, Version};
use crate::host::{HostCapabilities, Os};

/// How an unmet dependency affects the install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Fatal,
  Advisory,
}

/// Result of checking one dependency.
#[derive(Debug, Clone, Serialize)]
pub struct ConstraintOutcome {
  pub dependency: Dependency,
  /// What the host provides; `None` when absent or unknown.
  pub found: Option<Version>,
  pub satisfied: bool,
}

impl ConstraintOutcome {
  pub fn severity(&self) -> Severity {
    match self.dependency.phase {
      Phase::Build => Severity::Fatal,
      Phase::Runtime => Severity::Advisory,
    }
  }

  pub fn is_fatal(&self) -> bool {
    !self.satisfied && self.severity() == Severity::Fatal
  }

  fn to_unmet(&self) -> UnmetDependency {
    UnmetDependency {
      name: self.dependency.name.clone(),
      required: self.dependency.min_version.as_ref().map(ToString::to_string),
      found: self.found.as_ref().map(ToString::to_string),
    }
  }
}

/// Outcomes for every dependency, in declaration order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConstraintReport {
  pub outcomes: Vec<ConstraintOutcome>,
}

impl ConstraintReport {
  pub fn unmet(&self) -> impl Iterator<Item = &ConstraintOutcome> {
    self.outcomes.iter().filter(|o| !o.satisfied)
  }

  /// Unmet build dependencies.
  pub fn fatal(&self) -> impl Iterator<Item = &ConstraintOutcome> {
    self.outcomes.iter().filter(|o| o.is_fatal())
  }

  /// Unmet runtime dependencies.
  pub fn advisories(&self) -> impl Iterator<Item = &ConstraintOutcome> {
    self.unmet().filter(|o| o.severity() == Severity::Advisory)
  }

  pub fn is_satisfied(&self) -> bool {
    self.fatal().next().is_none()
  }

  /// `Err(UnmetBuildDependency)` listing every unmet build dependency, or the report itself.
  pub fn into_result(self) -> Result<Self, InstallError> {
    let unmet: Vec<UnmetDependency> = self.fatal().map(ConstraintOutcome::to_unmet).collect();
    if unmet.is_empty() {
      Ok(self)
    } else {
      Err(InstallError::UnmetBuildDependency { unmet })
    }
  }
}

/// Evaluate every dependency of `descriptor` against `host`.
///
/// All dependencies are evaluated even after an unmet one, so the caller
/// sees the complete set in one report. Unmet runtime dependencies are
/// logged as warnings.
pub fn check_constraints(descriptor: &FormulaDescriptor, host: &HostCapabilities) -> ConstraintReport {
  let outcomes = descriptor
    .dependencies
    .iter()
    .map(|dep| {
      let outcome = check_one(dep, host);
      if !outcome.satisfied && outcome.severity() == Severity::Advisory {
        warn!(
          formula = %descriptor.id(),
          dependency = %dep.name,
          required = ?dep.min_version.as_ref().map(ToString::to_string),
          found = ?outcome.found.as_ref().map(ToString::to_string),
          "runtime dependency not satisfied"
        );
      } else {
        debug!(dependency = %dep.name, satisfied = outcome.satisfied, "checked dependency");
      }
      outcome
    })
    .collect();

  ConstraintReport { outcomes }
}

fn check_one(dep: &Dependency, host: &HostCapabilities) -> ConstraintOutcome {
  let (present, found) = match Os::from_dependency(&dep.name) {
    Some(os) => {
      let is_host_os = host.os == Some(os);
      (is_host_os, if is_host_os { host.os_version.clone() } else { None })
    }
    None => {
      let found = host.tool_version(&dep.name).cloned();
      (found.is_some(), found)
    }
  };

  let satisfied = present
    && match (&dep.min_version, &found) {
      (None, _) => true,
      (Some(min), Some(found)) => found >= min,
      (Some(_), None) => false,
    };

  ConstraintOutcome {
    dependency: dep.clone(),
    found,
    satisfied,
  }
}
