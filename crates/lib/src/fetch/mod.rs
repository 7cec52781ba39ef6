//! Source retrieval and integrity verification.
//!
//! The archive is downloaded in full and its SHA-256 compared against the
//! descriptor before anything touches the filesystem. Only then is a scratch
//! directory created and the archive extracted into it.

pub mod archive;
mod scratch;

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::InstallError;
use crate::util::hash::{ContentHash, hash_bytes};

pub use scratch::Scratch;

/// A verified, extracted source tree.
#[derive(Debug)]
pub struct FetchedSource {
  pub scratch: Scratch,
  pub archive_hash: ContentHash,
  pub size: usize,
}

impl FetchedSource {
  pub fn build_path(&self) -> &Path {
    self.scratch.build_path()
  }
}

/// Summary of a download that was verified but not extracted.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FetchSummary {
  pub url: String,
  pub sha256: ContentHash,
  pub size: usize,
}

/// Where a source URL points.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SourceLocation {
  Remote(String),
  Local(PathBuf),
}

impl SourceLocation {
  fn parse(url: &str) -> Result<Self, InstallError> {
    if url.starts_with("http://") || url.starts_with("https://") {
      return Ok(Self::Remote(url.to_string()));
    }
    if let Some(path) = url.strip_prefix("file://") {
      return Ok(Self::Local(PathBuf::from(path)));
    }
    if url.contains("://") {
      return Err(InstallError::FetchFailed {
        url: url.to_string(),
        message: "unsupported URL scheme".to_string(),
      });
    }
    Ok(Self::Local(PathBuf::from(url)))
  }
}

/// Retrieve the raw archive bytes.
pub async fn download(url: &str) -> Result<Vec<u8>, InstallError> {
  let fetch_failed = |message: String| InstallError::FetchFailed {
    url: url.to_string(),
    message,
  };

  match SourceLocation::parse(url)? {
    SourceLocation::Remote(url) => {
      info!(url = %url, "fetching URL");
      let response = reqwest::get(&url).await.map_err(|e| fetch_failed(e.to_string()))?;

      if !response.status().is_success() {
        return Err(fetch_failed(format!("HTTP {}", response.status())));
      }

      let bytes = response.bytes().await.map_err(|e| fetch_failed(e.to_string()))?;
      Ok(bytes.to_vec())
    }
    SourceLocation::Local(path) => {
      info!(path = ?path, "reading local archive");
      tokio::fs::read(&path).await.map_err(|e| fetch_failed(e.to_string()))
    }
  }
}

/// Compare the digest of `bytes` against `expected`.
pub fn verify_integrity(url: &str, bytes: &[u8], expected: &ContentHash) -> Result<ContentHash, InstallError> {
  let actual = hash_bytes(bytes);
  if &actual != expected {
    return Err(InstallError::IntegrityMismatch {
      url: url.to_string(),
      expected: expected.to_string(),
      actual: actual.to_string(),
    });
  }
  debug!(url = %url, sha256 = %actual, "integrity verified");
  Ok(actual)
}

/// Download and verify without extracting.
pub async fn fetch_only(url: &str, expected: &ContentHash) -> Result<FetchSummary, InstallError> {
  let bytes = download(url).await?;
  let sha256 = verify_integrity(url, &bytes, expected)?;
  Ok(FetchSummary {
    url: url.to_string(),
    sha256,
    size: bytes.len(),
  })
}

/// Download, verify and extract into a fresh scratch directory under `scratch_root`.
///
/// On any error after the scratch directory exists it is removed before the
/// error is returned.
pub async fn fetch_source(
  url: &str,
  expected: &ContentHash,
  scratch_root: &Path,
  label: &str,
) -> Result<FetchedSource, InstallError> {
  let bytes = download(url).await?;
  let archive_hash = verify_integrity(url, &bytes, expected)?;
  let size = bytes.len();

  let mut scratch = Scratch::create(scratch_root, label).map_err(|e| InstallError::FetchFailed {
    url: url.to_string(),
    message: format!("failed to create scratch directory under {}: {}", scratch_root.display(), e),
  })?;
  let source_dir = scratch.source_dir();

  let extracted = tokio::task::spawn_blocking(move || {
    archive::unpack(&bytes, &source_dir)?;
    archive::build_root(&source_dir).map_err(|e| e.to_string())
  })
  .await
  .map_err(|e| e.to_string())
  .and_then(|r| r);

  match extracted {
    Ok(build_path) => {
      scratch.set_build_path(build_path);
      info!(url = %url, size, build_path = ?scratch.build_path(), "source ready");
      Ok(FetchedSource {
        scratch,
        archive_hash,
        size,
      })
    }
    Err(message) => {
      drop(scratch);
      Err(InstallError::FetchFailed {
        url: url.to_string(),
        message,
      })
    }
  }
}
