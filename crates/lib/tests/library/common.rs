//! Shared fixtures for library integration tests.

use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use pour_lib::formula::FormulaDescriptor;
use pour_lib::install::Prefix;
use pour_lib::pipeline::PipelineOptions;
use pour_lib::util::hash::{ContentHash, hash_bytes};
use tempfile::TempDir;

/// An isolated prefix, scratch root and archive directory.
pub struct Fixture {
  pub temp: TempDir,
  pub prefix: Prefix,
  pub scratch: PathBuf,
}

impl Fixture {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let prefix = Prefix::new(temp.path().join("prefix"));
    let scratch = temp.path().join("scratch");
    Self { temp, prefix, scratch }
  }

  pub fn path(&self) -> &Path {
    self.temp.path()
  }

  pub fn options(&self) -> PipelineOptions {
    PipelineOptions::new(self.prefix.clone(), &self.scratch)
  }

  /// Write the standard `tool-1.0` source archive; returns its path and digest.
  pub fn tool_archive(&self, name: &str) -> (PathBuf, ContentHash) {
    let script = format!("#!/bin/sh\necho \"{} 1.0\"\n", name);
    let man = format!(".TH {} 1", name.to_uppercase());
    let top = format!("{}-1.0", name);
    let bytes = tar_gz(&[
      (&format!("{}/{}.sh", top, name), script.as_bytes(), 0o755),
      (&format!("{}/{}.1", top, name), man.as_bytes(), 0o644),
    ]);
    let path = self.path().join(format!("{}-1.0.tar.gz", name));
    std::fs::write(&path, &bytes).unwrap();
    (path, hash_bytes(&bytes))
  }

  /// Number of entries left under the scratch root.
  pub fn scratch_entries(&self) -> usize {
    std::fs::read_dir(&self.scratch).map(|d| d.count()).unwrap_or(0)
  }

  pub fn build_log(&self) -> PathBuf {
    self.path().join("build.log")
  }
}

pub fn tar_gz(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
  let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
  for (path, data, mode) in entries {
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(*mode);
    builder.append_data(&mut header, path, *data).unwrap();
  }
  builder.into_inner().unwrap().finish().unwrap()
}

/// A formula that "builds" `<name>` by copying its script into `build/out/`.
///
/// `build_script` replaces the default build when given. Every build appends
/// a line to `build_log` so tests can count invocations.
pub fn tool_formula(
  name: &str,
  url: &Path,
  sha256: &ContentHash,
  build_log: &Path,
  build_script: Option<&str>,
) -> FormulaDescriptor {
  let default_script = format!(
    "echo built >> \"$BUILD_LOG\" && mkdir -p build/out && cp {name}.sh build/out/{name}"
  );
  let script = build_script.map(str::to_string).unwrap_or(default_script);

  FormulaDescriptor::from_toml_str(&format!(
    r#"
name = "{name}"
version = "1.0"
url = "file://{url}"
sha256 = "{sha256}"

[[build]]
run = "/bin/sh"
args = ["-c", '{script}']
env = {{ BUILD_LOG = "{log}" }}

[[install]]
from = "build/out/{name}"
to = "binary"

[[install]]
from = "{name}.1"
to = "man1"

[test]
run = "{name}"
args = ["--version"]
expect = "${{version}}"
"#,
    url = url.display(),
    log = build_log.display(),
  ))
  .unwrap()
}
