//! Exclusively-owned scratch directories.
//!
//! One scratch directory per install run, removed when the [`Scratch`] is
//! dropped unless the caller explicitly keeps it.
//!
//! Layout:
//! - `src/` - extracted source archive
//! - `tmp/` - `TMPDIR` for build steps

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

pub struct Scratch {
  dir: TempDir,
  build_path: PathBuf,
}

impl Scratch {
  /// Create a fresh scratch directory under `root`, named after `label`.
  pub fn create(root: &Path, label: &str) -> std::io::Result<Self> {
    std::fs::create_dir_all(root)?;
    let prefix = format!("{}-", sanitize(label));
    let dir = tempfile::Builder::new().prefix(&prefix).tempdir_in(root)?;
    std::fs::create_dir(dir.path().join("src"))?;
    std::fs::create_dir(dir.path().join("tmp"))?;
    let build_path = dir.path().join("src");
    debug!(path = %dir.path().display(), "created scratch directory");
    Ok(Self { dir, build_path })
  }

  /// Root of the scratch directory.
  pub fn path(&self) -> &Path {
    self.dir.path()
  }

  /// Where extracted sources live.
  pub fn source_dir(&self) -> PathBuf {
    self.dir.path().join("src")
  }

  /// Root of the source tree that build steps run in.
  pub fn build_path(&self) -> &Path {
    &self.build_path
  }

  pub(crate) fn set_build_path(&mut self, path: PathBuf) {
    self.build_path = path;
  }

  /// Temp directory handed to build steps.
  pub fn tmp_dir(&self) -> PathBuf {
    self.dir.path().join("tmp")
  }

  /// Stop tracking the directory so it survives this value; returns its path.
  pub fn keep(self) -> PathBuf {
    self.dir.keep()
  }
}

impl std::fmt::Debug for Scratch {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Scratch")
      .field("path", &self.dir.path())
      .field("build_path", &self.build_path)
      .finish()
  }
}

/// Only allow alphanumeric, dash, underscore and dot in directory names.
fn sanitize(label: &str) -> String {
  label
    .chars()
    .map(|c| {
      if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
        c
      } else {
        '-'
      }
    })
    .collect()
}
