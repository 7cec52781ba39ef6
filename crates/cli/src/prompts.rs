//! Interactive confirmation for commands that remove files from the prefix.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;

use anyhow::{Result, bail};

/// Ask before removing `files` installed files of `name` from `prefix`.
///
/// `force` skips the prompt. Without a terminal on both stdin and stderr the
/// prompt cannot be shown and `force` is required.
pub fn confirm_removal(name: &str, files: usize, prefix: &Path, force: bool) -> Result<bool> {
  if force {
    return Ok(true);
  }

  if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
    bail!("Refusing to remove {} without confirmation in non-interactive mode. Use --force to proceed.", name);
  }

  let mut stderr = io::stderr().lock();
  write!(stderr, "Remove {} ({} files) from {}? [y/N] ", name, files, prefix.display())?;
  stderr.flush()?;

  let mut answer = String::new();
  io::stdin().lock().read_line(&mut answer)?;

  Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
  matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
