//! TOML front-end for formula files.
//!
//! Raw serde structs mirror the file layout; [`FormulaDescriptor::from_toml_str`]
//! validates them into an immutable descriptor.

use std::collections::BTreeMap;
use std::path::{Component, Path};
use std::str::FromStr;

use serde::Deserialize;
use tracing::debug;

use crate::error::InstallError;
use crate::formula::types::{
  BuildStep, Category, CommandSpec, Dependency, FormulaDescriptor, InstallMapping, Phase, TestCommand,
};
use crate::formula::version::{Version, infer_from_url, macos_codename};
use crate::placeholder;
use crate::util::hash::ContentHash;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFormula {
  name: Option<String>,
  version: Option<String>,
  desc: Option<String>,
  homepage: Option<String>,
  license: Option<String>,
  url: Option<String>,
  sha256: Option<String>,
  #[serde(default)]
  depends_on: Vec<RawDependency>,
  #[serde(default)]
  build: Vec<RawStep>,
  #[serde(default)]
  install: Vec<RawMapping>,
  test: Option<RawTest>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDependency {
  name: String,
  version: Option<String>,
  phase: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStep {
  run: Option<String>,
  mkdir: Option<String>,
  #[serde(default)]
  args: Vec<String>,
  #[serde(default)]
  env: BTreeMap<String, String>,
  cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMapping {
  from: String,
  to: String,
  #[serde(rename = "as")]
  rename: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTest {
  run: String,
  #[serde(default)]
  args: Vec<String>,
  expect: Option<String>,
}

impl FormulaDescriptor {
  /// Parse a formula file.
  pub fn from_path(path: &Path) -> Result<Self, InstallError> {
    debug!(path = %path.display(), "reading formula");
    let content = std::fs::read_to_string(path)?;
    Self::from_toml_str(&content).map_err(|err| match err {
      InstallError::MalformedDescriptor { reason } => {
        InstallError::malformed(format!("{}: {}", path.display(), reason))
      }
      other => other,
    })
  }

  /// Parse a formula from TOML text.
  ///
  /// # Errors
  ///
  /// - `MalformedDescriptor` when a required field is missing or ill-formed
  /// - `UnsupportedConstraint` for an unknown dependency phase or destination category
  pub fn from_toml_str(content: &str) -> Result<Self, InstallError> {
    let raw: RawFormula = toml::from_str(content).map_err(|e| InstallError::malformed(e.message().to_string()))?;
    raw.validate()
  }
}

impl RawFormula {
  fn validate(self) -> Result<FormulaDescriptor, InstallError> {
    let name = required(self.name, "name")?;
    if !is_valid_name(&name) {
      return Err(InstallError::malformed(format!("invalid formula name '{}'", name)));
    }

    let source_url = required(self.url, "url")?;
    let sha256 = required(self.sha256, "sha256")?;
    let integrity_hash = ContentHash::parse(&sha256)
      .ok_or_else(|| InstallError::malformed(format!("sha256 must be 64 hex characters, got '{}'", sha256)))?;

    let version = match self.version {
      Some(v) => Version::parse(&v).ok_or_else(|| InstallError::malformed(format!("invalid version '{}'", v)))?,
      None => infer_from_url(&source_url).ok_or_else(|| {
        InstallError::malformed(format!("no version given and none could be inferred from '{}'", source_url))
      })?,
    };

    let dependencies = self
      .depends_on
      .into_iter()
      .map(RawDependency::validate)
      .collect::<Result<Vec<_>, _>>()?;

    if self.build.is_empty() {
      return Err(InstallError::malformed("at least one build step is required"));
    }
    let build_steps = self
      .build
      .into_iter()
      .enumerate()
      .map(|(idx, step)| step.validate(idx))
      .collect::<Result<Vec<_>, _>>()?;

    let install_mappings = self
      .install
      .into_iter()
      .map(RawMapping::validate)
      .collect::<Result<Vec<_>, _>>()?;

    let test_command = self.test.map(RawTest::validate).transpose()?;

    Ok(FormulaDescriptor {
      name,
      version,
      description: self.desc,
      homepage: self.homepage,
      license: self.license,
      source_url,
      integrity_hash,
      dependencies,
      build_steps,
      install_mappings,
      test_command,
    })
  }
}

impl RawDependency {
  fn validate(self) -> Result<Dependency, InstallError> {
    let phase = match self.phase.as_deref() {
      None => Phase::Runtime,
      Some(p) => Phase::from_str(p).map_err(|value| InstallError::UnsupportedConstraint {
        field: "dependency phase",
        value,
      })?,
    };

    let min_version = match self.version {
      None => None,
      Some(v) => {
        let parsed = Version::parse(&v).or_else(|| {
          if self.name == "macos" {
            macos_codename(&v)
          } else {
            None
          }
        });
        Some(parsed.ok_or_else(|| {
          InstallError::malformed(format!("invalid version '{}' for dependency '{}'", v, self.name))
        })?)
      }
    };

    Ok(Dependency {
      name: self.name,
      min_version,
      phase,
    })
  }
}

impl RawStep {
  fn validate(self, idx: usize) -> Result<BuildStep, InstallError> {
    match (self.run, self.mkdir) {
      (Some(program), None) => {
        check_template(&program, idx)?;
        for arg in &self.args {
          check_template(arg, idx)?;
        }
        for value in self.env.values() {
          check_template(value, idx)?;
        }
        if let Some(cwd) = &self.cwd {
          check_template(cwd, idx)?;
        }
        Ok(BuildStep::Run(CommandSpec {
          program,
          args: self.args,
          env: self.env,
          cwd: self.cwd,
        }))
      }
      (None, Some(path)) => {
        if !self.args.is_empty() || !self.env.is_empty() || self.cwd.is_some() {
          return Err(InstallError::malformed(format!(
            "build step {}: mkdir takes no args, env or cwd",
            idx
          )));
        }
        check_template(&path, idx)?;
        Ok(BuildStep::Mkdir { path })
      }
      (Some(_), Some(_)) => Err(InstallError::malformed(format!(
        "build step {}: set exactly one of `run` or `mkdir`",
        idx
      ))),
      (None, None) => Err(InstallError::malformed(format!(
        "build step {}: missing `run` or `mkdir`",
        idx
      ))),
    }
  }
}

impl RawMapping {
  fn validate(self) -> Result<InstallMapping, InstallError> {
    let category = Category::from_str(&self.to).map_err(|value| InstallError::UnsupportedConstraint {
      field: "destination category",
      value,
    })?;

    if !is_contained_relative(&self.from) {
      return Err(InstallError::malformed(format!(
        "install path '{}' must be relative to the build path",
        self.from
      )));
    }

    if let Some(rename) = &self.rename
      && (rename.is_empty() || rename.contains(['/', '\\']) || rename == "." || rename == "..")
    {
      return Err(InstallError::malformed(format!("invalid install name '{}'", rename)));
    }

    Ok(InstallMapping {
      built_path: self.from,
      category,
      rename: self.rename,
    })
  }
}

impl RawTest {
  fn validate(self) -> Result<TestCommand, InstallError> {
    for template in std::iter::once(&self.run).chain(self.args.iter()).chain(self.expect.iter()) {
      placeholder::validate(template).map_err(|e| InstallError::malformed(format!("test command: {}", e)))?;
    }
    Ok(TestCommand {
      program: self.run,
      args: self.args,
      expect: self.expect,
    })
  }
}

fn required(value: Option<String>, field: &str) -> Result<String, InstallError> {
  match value {
    Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
    _ => Err(InstallError::malformed(format!("missing required field `{}`", field))),
  }
}

fn check_template(template: &str, idx: usize) -> Result<(), InstallError> {
  placeholder::validate(template).map_err(|e| InstallError::malformed(format!("build step {}: {}", idx, e)))
}

fn is_valid_name(name: &str) -> bool {
  let mut chars = name.chars();
  chars.next().is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '+' | '.' | '_' | '-'))
}

/// A relative path that cannot escape its base directory.
pub(crate) fn is_contained_relative(path: &str) -> bool {
  let path = Path::new(path);
  !path.as_os_str().is_empty() && path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
