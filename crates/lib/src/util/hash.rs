//! SHA-256 helpers for archive verification and install receipts.
//!
//! - `ContentHash`: a full 64-character lowercase hex digest
//! - `hash_bytes()`: hash an in-memory buffer
//! - `hash_file()`: hash a file's contents

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest.
pub const SHA256_HEX_LEN: usize = 64;

/// A full 64-character SHA-256 digest.
///
/// # Format
///
/// Always lowercase hexadecimal. Use [`ContentHash::parse`] for user-supplied
/// values so that uppercase input compares equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
  /// Parse and normalize a hex digest. Returns `None` unless the input is
  /// exactly 64 hex characters.
  pub fn parse(input: &str) -> Option<Self> {
    let trimmed = input.trim();
    if trimmed.len() != SHA256_HEX_LEN || !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
      return None;
    }
    Some(ContentHash(trimmed.to_ascii_lowercase()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Hash arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash(hex::encode(hasher.finalize()))
}

/// Hash a file's contents, streaming in 8 KiB chunks.
pub fn hash_file(path: &Path) -> std::io::Result<ContentHash> {
  let mut file = fs::File::open(path)?;
  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(ContentHash(hex::encode(hasher.finalize())))
}
