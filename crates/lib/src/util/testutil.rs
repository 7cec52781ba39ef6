//! Test utilities for pour-lib.
//!
//! Helpers for building fixture archives in memory and on disk.

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;

/// A file to place in a fixture archive: (path inside archive, contents, unix mode).
pub type ArchiveEntry<'a> = (&'a str, &'a [u8], u32);

/// Build a gzip-compressed tarball in memory.
pub fn tar_gz(entries: &[ArchiveEntry<'_>]) -> Vec<u8> {
  let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
  for (path, data, mode) in entries {
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(*mode);
    builder.append_data(&mut header, path, *data).unwrap();
  }
  builder.into_inner().unwrap().finish().unwrap()
}

/// Build a zip archive in memory.
pub fn zip(entries: &[ArchiveEntry<'_>]) -> Vec<u8> {
  let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
  for (path, data, mode) in entries {
    let options = zip::write::SimpleFileOptions::default().unix_permissions(*mode);
    writer.start_file(*path, options).unwrap();
    writer.write_all(data).unwrap();
  }
  writer.finish().unwrap().into_inner()
}

/// Write a tarball to `dir/name` and return its path.
pub fn write_tar_gz(dir: &Path, name: &str, entries: &[ArchiveEntry<'_>]) -> PathBuf {
  let path = dir.join(name);
  std::fs::write(&path, tar_gz(entries)).unwrap();
  path
}

/// Returns the shell and args to run a script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), script.to_string()])
}
