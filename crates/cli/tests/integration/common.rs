//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use flate2::Compression;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use tempfile::TempDir;

/// Isolated test environment.
///
/// Each test gets its own prefix, formula directory, scratch root and XDG
/// directories under one temporary directory.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  fn dir(&self, name: &str) -> PathBuf {
    let p = self.temp.path().join(name);
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  pub fn prefix_path(&self) -> PathBuf {
    self.dir("prefix")
  }

  pub fn formula_path(&self) -> PathBuf {
    self.dir("formula")
  }

  pub fn scratch_path(&self) -> PathBuf {
    self.dir("scratch")
  }

  pub fn archives_path(&self) -> PathBuf {
    self.dir("archives")
  }

  /// Get a pre-configured Command for the pour binary.
  ///
  /// Sets environment variables for isolated testing:
  /// - `POUR_PREFIX`, `POUR_FORMULA_PATH`, `POUR_SCRATCH_DIR`
  /// - `XDG_CONFIG_HOME`: so no user config file is picked up
  /// - `XDG_DATA_HOME`, `XDG_CACHE_HOME`
  pub fn pour_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("pour");
    cmd.env("POUR_PREFIX", self.prefix_path());
    cmd.env("POUR_FORMULA_PATH", self.formula_path());
    cmd.env("POUR_SCRATCH_DIR", self.scratch_path());
    cmd.env("XDG_CONFIG_HOME", self.dir("config"));
    cmd.env("XDG_DATA_HOME", self.dir("data"));
    cmd.env("XDG_CACHE_HOME", self.dir("cache"));
    cmd
  }

  /// Write a `<name>-1.0.tar.gz` source archive holding `<name>.sh` and
  /// `<name>.1`; returns its path and lowercase hex SHA-256.
  pub fn tool_archive(&self, name: &str) -> (PathBuf, String) {
    let script = format!("#!/bin/sh\necho \"{} 1.0\"\n", name);
    let man = format!(".TH {} 1", name.to_uppercase());
    let top = format!("{}-1.0", name);

    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, data, mode) in [
      (format!("{}/{}.sh", top, name), script.as_bytes(), 0o755),
      (format!("{}/{}.1", top, name), man.as_bytes(), 0o644),
    ] {
      let mut header = tar::Header::new_gnu();
      header.set_size(data.len() as u64);
      header.set_mode(mode);
      builder.append_data(&mut header, &path, data).unwrap();
    }
    let bytes = builder.into_inner().unwrap().finish().unwrap();

    let path = self.archives_path().join(format!("{}-1.0.tar.gz", name));
    std::fs::write(&path, &bytes).unwrap();
    (path, hex::encode(Sha256::digest(&bytes)))
  }

  /// Write `<name>.toml` into the formula directory.
  pub fn write_formula(&self, name: &str, content: &str) -> PathBuf {
    let path = self.formula_path().join(format!("{}.toml", name));
    std::fs::write(&path, content).unwrap();
    path
  }

  /// Archive plus a formula that copies the script into `bin/` and the
  /// manual page into `man1/`, tested with `<name> --version`.
  pub fn tool(&self, name: &str) -> PathBuf {
    let (archive, sha256) = self.tool_archive(name);
    self.write_formula(name, &tool_formula(name, &archive, &sha256, ""))
  }
}

/// Formula text for [`TestEnv::tool_archive`]; `extra` is appended verbatim.
pub fn tool_formula(name: &str, archive: &Path, sha256: &str, extra: &str) -> String {
  format!(
    r#"
name = "{name}"
version = "1.0"
url = "file://{url}"
sha256 = "{sha256}"

[[build]]
run = "/bin/sh"
args = ["-c", "mkdir -p build/out && cp {name}.sh build/out/{name}"]

[[install]]
from = "build/out/{name}"
to = "bin"

[[install]]
from = "{name}.1"
to = "man1"

[test]
run = "{name}"
args = ["--version"]
expect = "${{version}}"
{extra}
"#,
    url = archive.display(),
  )
}
