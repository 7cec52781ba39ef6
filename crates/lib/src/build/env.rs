//! The environment build steps run in.
//!
//! Steps start from an empty environment. A short list of host variables is
//! passed through (toolchains on macOS need `DEVELOPER_DIR`/`SDKROOT`, most
//! build tools need `PATH` and `HOME`), then fixed values for locale and
//! timestamps are layered on top, then the step's own overrides.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::Path;

use crate::consts::SOURCE_DATE_EPOCH;

/// Host variables copied into the build environment when set.
pub const PASSTHROUGH_VARS: &[&str] = &["PATH", "HOME", "USER", "LOGNAME", "DEVELOPER_DIR", "SDKROOT"];

/// Base environment for one build, before step overrides.
pub fn base_environment(tmp_dir: &Path) -> BTreeMap<String, OsString> {
  let mut env = BTreeMap::new();

  for var in PASSTHROUGH_VARS {
    if let Some(value) = std::env::var_os(var) {
      env.insert((*var).to_string(), value);
    }
  }

  for var in ["TMPDIR", "TMP", "TEMP"] {
    env.insert(var.to_string(), tmp_dir.as_os_str().to_os_string());
  }
  env.insert("LANG".to_string(), OsString::from("C"));
  env.insert("LC_ALL".to_string(), OsString::from("C"));
  env.insert("SOURCE_DATE_EPOCH".to_string(), OsString::from(SOURCE_DATE_EPOCH));

  #[cfg(windows)]
  if let Some(root) = std::env::var_os("SystemRoot") {
    env.insert("SystemRoot".to_string(), root);
  }

  env
}
