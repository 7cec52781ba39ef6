//! Formula directory loading and version resolution.
//!
//! A formula directory holds `<name>.toml` files and, for additional
//! versions, `<name>@<version>.toml` files. Every file is parsed into its own
//! immutable descriptor; descriptors are keyed by `(name, version)`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::error::InstallError;
use crate::formula::{FormulaDescriptor, Version};

#[derive(Debug, Error)]
pub enum RegistryError {
  #[error("failed to read formula directory {path}: {source}")]
  ReadDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("{path}: {source}")]
  Formula {
    path: PathBuf,
    #[source]
    source: InstallError,
  },

  #[error("{id} is defined twice: {first} and {second}")]
  Duplicate {
    id: String,
    first: PathBuf,
    second: PathBuf,
  },

  #[error("invalid formula reference '{0}' (expected name or name@version)")]
  InvalidReference(String),

  #[error("no formula named '{0}'")]
  NotFound(String),

  #[error("no version {version} of '{name}' (available: {})", .available.join(", "))]
  VersionNotFound {
    name: String,
    version: String,
    available: Vec<String>,
  },
}

#[derive(Debug)]
struct Entry {
  descriptor: FormulaDescriptor,
  source: PathBuf,
}

/// All formulas found in one directory.
#[derive(Debug, Default)]
pub struct Registry {
  formulas: BTreeMap<String, BTreeMap<Version, Entry>>,
}

impl Registry {
  /// Load every `*.toml` file in `dir`.
  ///
  /// A missing directory yields an empty registry. Any unparsable formula
  /// fails the whole load, naming the offending file.
  pub fn load(dir: &Path) -> Result<Self, RegistryError> {
    let mut registry = Registry::default();

    if !dir.exists() {
      debug!(path = %dir.display(), "formula directory does not exist");
      return Ok(registry);
    }

    let read_err = |source| RegistryError::ReadDir {
      path: dir.to_path_buf(),
      source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_err)? {
      let path = entry.map_err(read_err)?.path();
      if path.is_file() && path.extension().is_some_and(|ext| ext == "toml") {
        paths.push(path);
      }
    }
    paths.sort();

    for path in paths {
      let descriptor = FormulaDescriptor::from_path(&path).map_err(|source| RegistryError::Formula {
        path: path.clone(),
        source,
      })?;
      registry.insert(descriptor, path)?;
    }

    debug!(path = %dir.display(), count = registry.len(), "loaded formulas");
    Ok(registry)
  }

  /// Add a descriptor read from `path`.
  pub fn insert(&mut self, descriptor: FormulaDescriptor, path: PathBuf) -> Result<(), RegistryError> {
    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
      let file_name = stem.split('@').next().unwrap_or(stem);
      if file_name != descriptor.name {
        warn!(
          path = %path.display(),
          name = %descriptor.name,
          "formula file name does not match formula name"
        );
      }
    }

    // Versions compare numerically, so `0.6` and `0.6.0` are the same key.
    let versions = self.formulas.entry(descriptor.name.clone()).or_default();
    if let Some(first) = versions.get(&descriptor.version) {
      return Err(RegistryError::Duplicate {
        id: descriptor.id(),
        first: first.source.clone(),
        second: path,
      });
    }

    versions.insert(
      descriptor.version.clone(),
      Entry {
        descriptor,
        source: path,
      },
    );
    Ok(())
  }

  /// Resolve a formula by name: the exact version if given, otherwise the highest.
  pub fn resolve(&self, name: &str, version: Option<&Version>) -> Result<&FormulaDescriptor, RegistryError> {
    let versions = self
      .formulas
      .get(name)
      .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

    let entry = match version {
      Some(wanted) => versions.get(wanted).ok_or_else(|| RegistryError::VersionNotFound {
        name: name.to_string(),
        version: wanted.to_string(),
        available: versions.keys().map(ToString::to_string).collect(),
      })?,
      // Entries are only created by `insert`, so the map is never empty.
      None => versions
        .values()
        .next_back()
        .ok_or_else(|| RegistryError::NotFound(name.to_string()))?,
    };
    Ok(&entry.descriptor)
  }

  /// Resolve a `name` or `name@version` reference.
  pub fn resolve_reference(&self, reference: &str) -> Result<&FormulaDescriptor, RegistryError> {
    let (name, version) = parse_reference(reference)?;
    self.resolve(&name, version.as_ref())
  }

  /// Known versions of `name`, lowest first.
  pub fn versions(&self, name: &str) -> Vec<&Version> {
    self.formulas.get(name).map(|v| v.keys().collect()).unwrap_or_default()
  }

  /// File a descriptor was loaded from.
  pub fn source_path(&self, descriptor: &FormulaDescriptor) -> Option<&Path> {
    self
      .formulas
      .get(&descriptor.name)
      .and_then(|versions| versions.get(&descriptor.version))
      .map(|entry| entry.source.as_path())
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.formulas.keys().map(String::as_str)
  }

  /// Number of descriptors across all names and versions.
  pub fn len(&self) -> usize {
    self.formulas.values().map(BTreeMap::len).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.formulas.is_empty()
  }
}

/// Split `name@version` into its parts.
pub fn parse_reference(reference: &str) -> Result<(String, Option<Version>), RegistryError> {
  match reference.split_once('@') {
    None if !reference.is_empty() => Ok((reference.to_string(), None)),
    Some((name, version)) if !name.is_empty() => {
      let version = Version::parse(version).ok_or_else(|| RegistryError::InvalidReference(reference.to_string()))?;
      Ok((name.to_string(), Some(version)))
    }
    _ => Err(RegistryError::InvalidReference(reference.to_string())),
  }
}
