//! User configuration.
//!
//! Values are layered, later layers winning:
//!
//! 1. built-in defaults (`~/.local`, XDG data and cache directories)
//! 2. `$XDG_CONFIG_HOME/pour/config.toml`
//! 3. `POUR_PREFIX`, `POUR_FORMULA_PATH`, `POUR_SCRATCH_DIR`
//!
//! Command-line flags are applied on top by the CLI.
//!
//! ```toml
//! prefix = "~/.local"
//! formula_dir = "~/formulas"
//! build_timeout = "30m"
//! keep_scratch = false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::consts::{FORMULA_PATH_ENV, PREFIX_ENV, SCRATCH_DIR_ENV};
use crate::install::Prefix;
use crate::platform::paths;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("invalid build_timeout '{value}': {source}")]
  InvalidTimeout {
    value: String,
    #[source]
    source: humantime::DurationError,
  },
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
  prefix: Option<String>,
  formula_dir: Option<String>,
  scratch_dir: Option<String>,
  build_timeout: Option<String>,
  keep_scratch: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  pub prefix: PathBuf,
  pub formula_dir: PathBuf,
  pub scratch_dir: PathBuf,
  pub build_timeout: Option<Duration>,
  pub keep_scratch: bool,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      prefix: paths::default_prefix(),
      formula_dir: paths::default_formula_dir(),
      scratch_dir: paths::default_scratch_dir(),
      build_timeout: None,
      keep_scratch: false,
    }
  }
}

impl Config {
  /// Load from the default config file location plus the environment.
  pub fn load() -> Result<Self, ConfigError> {
    Self::load_from(&paths::config_file())
  }

  /// Load from `path` (skipped when it does not exist) plus the environment.
  pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
    let mut config = Self::default();

    match std::fs::read_to_string(path) {
      Ok(contents) => {
        let file: ConfigFile = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
          path: path.to_path_buf(),
          source,
        })?;
        config.apply_file(file)?;
        debug!(path = ?path, "loaded config file");
      }
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
      Err(source) => {
        return Err(ConfigError::Read {
          path: path.to_path_buf(),
          source,
        });
      }
    }

    config.apply_env();
    Ok(config)
  }

  fn apply_file(&mut self, file: ConfigFile) -> Result<(), ConfigError> {
    if let Some(prefix) = file.prefix {
      self.prefix = expand_home(&prefix);
    }
    if let Some(dir) = file.formula_dir {
      self.formula_dir = expand_home(&dir);
    }
    if let Some(dir) = file.scratch_dir {
      self.scratch_dir = expand_home(&dir);
    }
    if let Some(value) = file.build_timeout {
      self.build_timeout = Some(parse_timeout(&value)?);
    }
    if let Some(keep) = file.keep_scratch {
      self.keep_scratch = keep;
    }
    Ok(())
  }

  fn apply_env(&mut self) {
    if let Ok(prefix) = std::env::var(PREFIX_ENV) {
      self.prefix = expand_home(&prefix);
    }
    if let Ok(dir) = std::env::var(FORMULA_PATH_ENV) {
      self.formula_dir = expand_home(&dir);
    }
    if let Ok(dir) = std::env::var(SCRATCH_DIR_ENV) {
      self.scratch_dir = expand_home(&dir);
    }
  }

  pub fn prefix(&self) -> Prefix {
    Prefix::new(&self.prefix)
  }
}

/// Parse a humantime duration such as `"30m"` or `"1h 30m"`.
pub fn parse_timeout(value: &str) -> Result<Duration, ConfigError> {
  humantime::parse_duration(value).map_err(|source| ConfigError::InvalidTimeout {
    value: value.to_string(),
    source,
  })
}

fn expand_home(path: &str) -> PathBuf {
  match path.strip_prefix("~/") {
    Some(rest) => paths::home_dir().join(rest),
    None if path == "~" => paths::home_dir(),
    None => PathBuf::from(path),
  }
}
