use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::consts::RECEIPT_DIR;
use crate::formula::{Category, FormulaDescriptor};
use crate::placeholder::{Placeholder, PlaceholderError, Resolver};

/// The root that destination category directories live under.
///
/// # Layout
///
/// ```text
/// <root>/bin/               Category::Bin
/// <root>/share/man/man1/    Category::Man(1)
/// <root>/var/db/pour/       install receipts
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prefix {
  root: PathBuf,
}

impl Prefix {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn category_dir(&self, category: Category) -> PathBuf {
    self.root.join(category.relative_dir())
  }

  pub fn receipt_dir(&self) -> PathBuf {
    self.root.join(RECEIPT_DIR)
  }

  pub fn receipt_path(&self, name: &str) -> PathBuf {
    self.receipt_dir().join(format!("{}.json", name))
  }
}

/// Resolves template placeholders for one formula against one prefix.
///
/// `${buildpath}` is only available while a build is running.
#[derive(Debug, Clone)]
pub struct FormulaResolver<'a> {
  name: &'a str,
  version: &'a str,
  prefix: &'a Prefix,
  build_path: Option<&'a Path>,
}

impl<'a> FormulaResolver<'a> {
  pub fn new(name: &'a str, version: &'a str, prefix: &'a Prefix) -> Self {
    Self {
      name,
      version,
      prefix,
      build_path: None,
    }
  }

  pub fn for_descriptor(descriptor: &'a FormulaDescriptor, prefix: &'a Prefix) -> Self {
    Self::new(&descriptor.name, descriptor.version.as_str(), prefix)
  }

  pub fn with_build_path(mut self, build_path: &'a Path) -> Self {
    self.build_path = Some(build_path);
    self
  }
}

impl Resolver for FormulaResolver<'_> {
  fn resolve(&self, placeholder: Placeholder) -> Result<String, PlaceholderError> {
    match placeholder {
      Placeholder::BuildPath => self
        .build_path
        .map(|p| p.display().to_string())
        .ok_or_else(|| PlaceholderError::Unavailable("buildpath".to_string())),
      Placeholder::Prefix => Ok(self.prefix.root().display().to_string()),
      Placeholder::Name => Ok(self.name.to_string()),
      Placeholder::Version => Ok(self.version.to_string()),
      Placeholder::Dir(category) => Ok(self.prefix.category_dir(category).display().to_string()),
    }
  }
}
