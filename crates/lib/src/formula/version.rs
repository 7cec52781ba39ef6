//! Lenient dotted versions.
//!
//! Toolchains and operating systems report versions like `10.0`, `13` or
//! `15.0 (15A240d)`, none of which are strict semver. [`Version`] accepts one
//! to three numeric components, pads the rest with zeros for ordering, and
//! keeps the original spelling for display.

use std::cmp::Ordering;
use std::fmt;

use serde::{Serialize, Serializer};

#[derive(Debug, Clone)]
pub struct Version {
  raw: String,
  parsed: semver::Version,
}

impl Version {
  /// Parse a dotted numeric version such as `0.6`, `v1.2.3` or `13`.
  pub fn parse(input: &str) -> Option<Self> {
    let trimmed = input.trim();
    let raw = trimmed.strip_prefix('v').unwrap_or(trimmed);
    if raw.is_empty() {
      return None;
    }

    let mut parts = [0u64; 3];
    for (idx, component) in raw.split('.').enumerate() {
      if component.is_empty() || !component.chars().all(|c| c.is_ascii_digit()) {
        return None;
      }
      let value = component.parse::<u64>().ok()?;
      // Components past the third (rare four-part builds) don't affect ordering.
      if idx < parts.len() {
        parts[idx] = value;
      }
    }

    Some(Self {
      raw: raw.to_string(),
      parsed: semver::Version::new(parts[0], parts[1], parts[2]),
    })
  }

  /// Find the first version-looking token in free-form tool output.
  ///
  /// `Xcode 15.0\nBuild version 15A240d` yields `15.0`.
  pub fn extract(text: &str) -> Option<Self> {
    text
      .split(|c: char| c.is_whitespace() || c == ',' || c == '(' || c == ')')
      .filter(|token| token.chars().next().is_some_and(|c| c.is_ascii_digit() || c == 'v'))
      .find_map(Version::parse)
  }

  pub fn as_str(&self) -> &str {
    &self.raw
  }

  pub fn semver(&self) -> &semver::Version {
    &self.parsed
  }
}

impl PartialEq for Version {
  fn eq(&self, other: &Self) -> bool {
    self.parsed == other.parsed
  }
}

impl Eq for Version {}

impl PartialOrd for Version {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Version {
  fn cmp(&self, other: &Self) -> Ordering {
    self.parsed.cmp(&other.parsed)
  }
}

impl fmt::Display for Version {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.raw)
  }
}

impl Serialize for Version {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.raw)
  }
}

/// macOS release codenames accepted for the `macos` dependency.
const MACOS_RELEASES: &[(&str, &str)] = &[
  ("tahoe", "26"),
  ("sequoia", "15"),
  ("sonoma", "14"),
  ("ventura", "13"),
  ("monterey", "12"),
  ("big_sur", "11"),
  ("catalina", "10.15"),
  ("mojave", "10.14"),
  ("high_sierra", "10.13"),
  ("sierra", "10.12"),
  ("el_capitan", "10.11"),
];

/// Map a macOS codename (`ventura`, `big_sur`) to its version.
pub fn macos_codename(name: &str) -> Option<Version> {
  let key = name.trim().trim_start_matches(':').to_ascii_lowercase().replace(['-', ' '], "_");
  MACOS_RELEASES
    .iter()
    .find(|(codename, _)| *codename == key)
    .and_then(|(_, version)| Version::parse(version))
}

const ARCHIVE_EXTENSIONS: &[&str] = &[".tar.gz", ".tgz", ".tar.bz2", ".tbz2", ".tar.xz", ".txz", ".tar", ".zip"];

/// Infer a version from a source archive URL.
///
/// Handles tag archives (`.../refs/tags/0.6.tar.gz`), `name-1.2.3.tar.gz`
/// and release assets like `tool-15.1.0-aarch64-apple-darwin.tar.gz`.
pub fn infer_from_url(url: &str) -> Option<Version> {
  let path = url.split(['?', '#']).next().unwrap_or(url);
  let filename = path.trim_end_matches('/').rsplit('/').next()?;

  let stem = ARCHIVE_EXTENSIONS
    .iter()
    .find_map(|ext| filename.strip_suffix(ext))
    .unwrap_or(filename);

  if let Some(version) = Version::parse(stem) {
    return Some(version);
  }

  stem.split(['-', '_']).skip(1).find_map(Version::parse)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
  }

  #[test]
  fn parse_pads_missing_components() {
    assert_eq!(v("10"), v("10.0.0"));
    assert_eq!(v("10.0"), v("10"));
    assert_eq!(v("13").semver(), &semver::Version::new(13, 0, 0));
  }

  #[test]
  fn parse_keeps_original_spelling() {
    assert_eq!(v("0.6").to_string(), "0.6");
    assert_eq!(v("v1.2.3").to_string(), "1.2.3");
  }

  #[test]
  fn parse_rejects_non_numeric() {
    assert!(Version::parse("").is_none());
    assert!(Version::parse("1.x").is_none());
    assert!(Version::parse("1..2").is_none());
    assert!(Version::parse("ventura").is_none());
  }

  #[test]
  fn ordering_is_numeric() {
    assert!(v("10.15") < v("11"));
    assert!(v("1.10") > v("1.9"));
    assert!(v("15.0") >= v("10.0"));
  }

  #[test]
  fn extract_from_tool_output() {
    assert_eq!(Version::extract("Xcode 15.0\nBuild version 15A240d").unwrap(), v("15.0"));
    assert_eq!(Version::extract("cmake version 3.27.4\n").unwrap(), v("3.27.4"));
    assert_eq!(
      Version::extract("git version 2.39.3 (Apple Git-145)").unwrap(),
      v("2.39.3")
    );
    assert!(Version::extract("no version here").is_none());
  }

  #[test]
  fn macos_codenames() {
    assert_eq!(macos_codename("ventura").unwrap(), v("13"));
    assert_eq!(macos_codename(":big_sur").unwrap(), v("11"));
    assert_eq!(macos_codename("High Sierra").unwrap(), v("10.13"));
    assert!(macos_codename("leopard").is_none());
  }

  #[test]
  fn infer_tag_archive() {
    let url = "https://github.com/sveinbjornt/hear/archive/refs/tags/0.6.tar.gz";
    assert_eq!(infer_from_url(url).unwrap().to_string(), "0.6");
  }

  #[test]
  fn infer_named_archive() {
    assert_eq!(
      infer_from_url("https://example.com/dl/tool-1.2.3.tar.gz").unwrap().to_string(),
      "1.2.3"
    );
    assert_eq!(
      infer_from_url("https://example.com/v2.0.zip?raw=true").unwrap().to_string(),
      "2.0"
    );
  }

  #[test]
  fn infer_release_asset() {
    let url = "https://github.com/u/r/releases/download/v15.1.0/rg-15.1.0-aarch64-apple-darwin.tar.gz";
    assert_eq!(infer_from_url(url).unwrap().to_string(), "15.1.0");
  }

  #[test]
  fn infer_fails_without_version() {
    assert!(infer_from_url("https://example.com/source.tar.gz").is_none());
    assert!(infer_from_url("https://example.com/").is_none());
  }
}
