//! Source archive extraction.
//!
//! Supports gzip-compressed tarballs, plain tarballs and zip files, detected
//! from their leading bytes rather than the URL.

use std::fs::{self, File};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
  TarGz,
  Tar,
  Zip,
}

impl ArchiveKind {
  /// Detect the archive format from magic bytes.
  pub fn detect(bytes: &[u8]) -> Option<Self> {
    if bytes.starts_with(&[0x1f, 0x8b]) {
      Some(Self::TarGz)
    } else if bytes.starts_with(b"PK\x03\x04") {
      Some(Self::Zip)
    } else if bytes.len() > 262 && &bytes[257..262] == b"ustar" {
      Some(Self::Tar)
    } else {
      None
    }
  }
}

/// Unpack `bytes` into `dest`.
///
/// Entries that would land outside `dest` are skipped.
pub fn unpack(bytes: &[u8], dest: &Path) -> Result<(), String> {
  let kind = ArchiveKind::detect(bytes).ok_or_else(|| "unsupported archive format".to_string())?;
  fs::create_dir_all(dest).map_err(|e| e.to_string())?;

  match kind {
    ArchiveKind::TarGz => unpack_tar(Archive::new(GzDecoder::new(Cursor::new(bytes))), dest),
    ArchiveKind::Tar => unpack_tar(Archive::new(Cursor::new(bytes)), dest),
    ArchiveKind::Zip => unpack_zip(bytes, dest),
  }
}

fn unpack_tar<R: std::io::Read>(mut archive: Archive<R>, dest: &Path) -> Result<(), String> {
  archive.set_preserve_permissions(true);
  archive.set_preserve_mtime(false);
  archive.unpack(dest).map_err(|e| format!("failed to unpack tarball: {}", e))
}

fn unpack_zip(bytes: &[u8], dest: &Path) -> Result<(), String> {
  let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| format!("failed to open zip: {}", e))?;

  for i in 0..archive.len() {
    let mut file = archive
      .by_index(i)
      .map_err(|e| format!("failed to read zip entry: {}", e))?;

    let Some(relative) = file.enclosed_name() else {
      continue;
    };
    let dest_path = dest.join(relative);

    if file.is_dir() {
      fs::create_dir_all(&dest_path).map_err(|e| e.to_string())?;
      continue;
    }

    if let Some(parent) = dest_path.parent() {
      fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    let mut outfile = File::create(&dest_path).map_err(|e| e.to_string())?;
    std::io::copy(&mut file, &mut outfile).map_err(|e| e.to_string())?;

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      if let Some(mode) = file.unix_mode() {
        fs::set_permissions(&dest_path, fs::Permissions::from_mode(mode)).map_err(|e| e.to_string())?;
      }
    }
  }

  Ok(())
}

/// The directory build steps should run in.
///
/// Source archives usually wrap everything in one top-level directory
/// (`hear-0.6/`); when they do, that directory is the build path.
pub fn build_root(extracted: &Path) -> std::io::Result<PathBuf> {
  let mut entries = fs::read_dir(extracted)?.collect::<Result<Vec<_>, _>>()?;
  if entries.len() == 1 && entries[0].file_type()?.is_dir() {
    return Ok(entries.remove(0).path());
  }
  Ok(extracted.to_path_buf())
}
