//! Copying build artifacts into the prefix.
//!
//! Every file is written to a temporary file next to its destination and
//! renamed into place. A failed copy never leaves a partial file and
//! re-running an install overwrites with identical content.
//!
//! Mappings are applied in order and nothing is rolled back: when a later
//! mapping fails, files from earlier ones stay installed and are listed in
//! the error.

mod prefix;
pub mod receipt;

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::InstallError;
use crate::formula::{Category, InstallMapping};
use crate::util::hash::{ContentHash, hash_file};

pub use prefix::{FormulaResolver, Prefix};
pub use receipt::{Receipt, ReceiptError};

/// One file written into the prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledFile {
  pub path: PathBuf,
  pub category: Category,
  pub sha256: ContentHash,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InstallReport {
  pub files: Vec<InstalledFile>,
}

impl InstallReport {
  pub fn paths(&self) -> Vec<PathBuf> {
    self.files.iter().map(|f| f.path.clone()).collect()
  }
}

/// Copy every mapping from `build_path` into `prefix`.
pub fn install_artifacts(
  mappings: &[InstallMapping],
  build_path: &Path,
  prefix: &Prefix,
) -> Result<InstallReport, InstallError> {
  let mut report = InstallReport::default();

  for mapping in mappings {
    let source = build_path.join(&mapping.built_path);
    let metadata = match fs::metadata(&source) {
      Ok(metadata) => metadata,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        warn!(built_path = %mapping.built_path, category = %mapping.category, "build artifact missing");
        return Err(InstallError::MissingBuildArtifact {
          built_path: mapping.built_path.clone(),
          category: mapping.category,
          installed: report.paths(),
        });
      }
      Err(e) => return Err(e.into()),
    };

    let dest_dir = prefix.category_dir(mapping.category);
    let dest_name = match &mapping.rename {
      Some(name) => name.into(),
      None => source
        .file_name()
        .map(PathBuf::from)
        .ok_or_else(|| InstallError::malformed(format!("install path '{}' has no file name", mapping.built_path)))?,
    };
    let dest = dest_dir.join(dest_name);

    if metadata.is_dir() {
      install_tree(&source, &dest, mapping.category, &mut report)?;
    } else {
      install_file(&source, &dest, mapping.category, &mut report)?;
    }
  }

  info!(files = report.files.len(), prefix = ?prefix.root(), "installed artifacts");
  Ok(report)
}

fn install_tree(source: &Path, dest: &Path, category: Category, report: &mut InstallReport) -> Result<(), InstallError> {
  for entry in WalkDir::new(source).sort_by_file_name() {
    let entry = entry.map_err(io::Error::from)?;
    let relative = entry
      .path()
      .strip_prefix(source)
      .map_err(|e| InstallError::Io(io::Error::other(e)))?;
    let target = dest.join(relative);

    if entry.file_type().is_dir() {
      fs::create_dir_all(&target)?;
    } else {
      install_file(entry.path(), &target, category, report)?;
    }
  }
  Ok(())
}

fn install_file(source: &Path, dest: &Path, category: Category, report: &mut InstallReport) -> Result<(), InstallError> {
  copy_atomic(source, dest, mode_for(category))?;
  let sha256 = hash_file(dest)?;
  debug!(source = ?source, dest = ?dest, sha256 = %sha256, "installed file");
  report.files.push(InstalledFile {
    path: dest.to_path_buf(),
    category,
    sha256,
  });
  Ok(())
}

fn mode_for(category: Category) -> u32 {
  if category.is_executable() { 0o755 } else { 0o644 }
}

/// Copy `source` to `dest` through a temporary file in the destination directory.
fn copy_atomic(source: &Path, dest: &Path, mode: u32) -> io::Result<()> {
  let dir = dest
    .parent()
    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "destination has no parent"))?;
  fs::create_dir_all(dir)?;

  let mut temp = NamedTempFile::new_in(dir)?;
  io::copy(&mut File::open(source)?, temp.as_file_mut())?;
  temp.as_file().sync_all()?;

  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    temp.as_file().set_permissions(fs::Permissions::from_mode(mode))?;
  }
  #[cfg(not(unix))]
  let _ = mode;

  temp.persist(dest).map_err(|e| e.error)?;
  Ok(())
}

/// What [`uninstall`] did with each file in the receipt.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UninstallReport {
  pub removed: Vec<PathBuf>,
  pub missing: Vec<PathBuf>,
  /// Changed since install; left in place.
  pub modified: Vec<PathBuf>,
}

/// Remove every file listed in `name`'s receipt, then the receipt.
///
/// Files are removed only if their content still matches what was installed.
/// Modified files are left in place and listed in the report; they no longer
/// belong to the formula once the receipt is gone.
pub fn uninstall(prefix: &Prefix, name: &str) -> Result<UninstallReport, ReceiptError> {
  let receipt = Receipt::load(prefix, name)?.ok_or_else(|| ReceiptError::NotInstalled(name.to_string()))?;
  let mut report = UninstallReport::default();

  for file in &receipt.files {
    match hash_file(&file.path) {
      Ok(hash) if hash == file.sha256 => {
        fs::remove_file(&file.path)?;
        report.removed.push(file.path.clone());
      }
      Ok(_) => {
        warn!(path = ?file.path, "file was modified after install, keeping it");
        report.modified.push(file.path.clone());
      }
      Err(e) if e.kind() == io::ErrorKind::NotFound => report.missing.push(file.path.clone()),
      Err(e) => return Err(e.into()),
    }
  }

  Receipt::remove(prefix, name)?;
  info!(
    name = %name,
    removed = report.removed.len(),
    kept = report.modified.len(),
    "uninstalled"
  );
  Ok(report)
}
