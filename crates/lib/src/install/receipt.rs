//! Install receipts.
//!
//! A receipt is written to `<prefix>/var/db/pour/<name>.json` once an install
//! has been verified (or verification was attempted). It records what was
//! installed from where, so that the prefix can be listed, re-tested and
//! cleaned up later without the original formula file.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use super::{InstalledFile, Prefix};
use crate::formula::{FormulaDescriptor, TestCommand};
use crate::util::hash::ContentHash;
use crate::verify::VerificationStatus;

#[derive(Debug, Error)]
pub enum ReceiptError {
  #[error("'{0}' is not installed")]
  NotInstalled(String),

  #[error("failed to parse receipt {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("io error: {0}")]
  Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
  pub name: String,
  pub version: String,
  pub source_url: String,
  pub sha256: ContentHash,
  pub files: Vec<InstalledFile>,
  pub test: Option<TestCommand>,
  pub verification: VerificationStatus,
  pub installed_at_unix: u64,
}

impl Receipt {
  pub fn new(descriptor: &FormulaDescriptor, files: Vec<InstalledFile>, verification: VerificationStatus) -> Self {
    Self {
      name: descriptor.name.clone(),
      version: descriptor.version.to_string(),
      source_url: descriptor.source_url.clone(),
      sha256: descriptor.integrity_hash.clone(),
      files,
      test: descriptor.test_command.clone(),
      verification,
      installed_at_unix: SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs(),
    }
  }

  /// Write atomically, replacing any previous receipt for the same name.
  pub fn write(&self, prefix: &Prefix) -> Result<PathBuf, ReceiptError> {
    let dir = prefix.receipt_dir();
    fs::create_dir_all(&dir)?;
    let path = prefix.receipt_path(&self.name);

    let mut temp = NamedTempFile::new_in(&dir)?;
    serde_json::to_writer_pretty(temp.as_file_mut(), self).map_err(io::Error::other)?;
    temp.as_file_mut().write_all(b"\n")?;
    temp.persist(&path).map_err(|e| e.error)?;

    debug!(path = ?path, "wrote install receipt");
    Ok(path)
  }

  /// `None` when `name` has no receipt.
  pub fn load(prefix: &Prefix, name: &str) -> Result<Option<Self>, ReceiptError> {
    let path = prefix.receipt_path(name);
    let contents = match fs::read_to_string(&path) {
      Ok(contents) => contents,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&contents)
      .map(Some)
      .map_err(|source| ReceiptError::Parse { path, source })
  }

  /// All receipts in the prefix, sorted by name.
  pub fn list(prefix: &Prefix) -> Result<Vec<Self>, ReceiptError> {
    let dir = prefix.receipt_dir();
    let entries = match fs::read_dir(&dir) {
      Ok(entries) => entries,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(e) => return Err(e.into()),
    };

    let mut receipts = Vec::new();
    for entry in entries {
      let path = entry?.path();
      if path.extension().is_none_or(|ext| ext != "json") {
        continue;
      }
      let contents = fs::read_to_string(&path)?;
      let receipt: Receipt =
        serde_json::from_str(&contents).map_err(|source| ReceiptError::Parse { path: path.clone(), source })?;
      receipts.push(receipt);
    }
    receipts.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(receipts)
  }

  pub fn remove(prefix: &Prefix, name: &str) -> Result<(), ReceiptError> {
    match fs::remove_file(prefix.receipt_path(name)) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ReceiptError::NotInstalled(name.to_string())),
      Err(e) => Err(e.into()),
    }
  }

  #[cfg(test)]
  pub(crate) fn for_test(name: &str, files: Vec<InstalledFile>) -> Self {
    Self {
      name: name.to_string(),
      version: "1.0".to_string(),
      source_url: format!("https://example.com/{}-1.0.tar.gz", name),
      sha256: crate::util::hash::hash_bytes(name.as_bytes()),
      files,
      test: None,
      verification: VerificationStatus::Skipped,
      installed_at_unix: 0,
    }
  }
}
