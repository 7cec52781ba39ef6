//! Placeholder parsing and substitution for formula templates.
//!
//! Build step arguments, environment values, working directories and the
//! test command may reference values that are only known once an install
//! is running (the scratch build path, the prefix directories).
//!
//! # Placeholder Formats
//!
//! - `${buildpath}` - root of the extracted source tree
//! - `${prefix}` - install prefix root
//! - `${name}` / `${version}` - formula identity
//! - `${bin}`, `${man1}`, ... - the directory of a destination category
//!
//! # Escaping
//!
//! Use `$${` to produce a literal `${`. A `$` not followed by `{` passes
//! through unchanged, so `$HOME` needs no escaping.
//!
//! # Example
//!
//! ```
//! use pour_lib::placeholder::{parse, Placeholder, Segment};
//!
//! let segments = parse("DSTROOT=${buildpath}/dst").unwrap();
//! assert_eq!(segments, vec![
//!     Segment::Literal("DSTROOT=".to_string()),
//!     Segment::Placeholder(Placeholder::BuildPath),
//!     Segment::Literal("/dst".to_string()),
//! ]);
//! ```

use std::str::FromStr;

use thiserror::Error;

use crate::formula::Category;

/// A parsed placeholder reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
  BuildPath,
  Prefix,
  Name,
  Version,
  Dir(Category),
}

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  Literal(String),
  Placeholder(Placeholder),
}

/// Errors that can occur during placeholder parsing or resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
  #[error("unclosed placeholder at position {0}")]
  Unclosed(usize),

  #[error("unknown placeholder: {0}")]
  Unknown(String),

  #[error("placeholder '{0}' is not available here")]
  Unavailable(String),
}

/// Supplies values for placeholders at execution time.
pub trait Resolver {
  fn resolve(&self, placeholder: Placeholder) -> Result<String, PlaceholderError>;
}

/// Parse a template into segments.
///
/// # Errors
///
/// Returns an error for unclosed or unknown placeholders.
pub fn parse(input: &str) -> Result<Vec<Segment>, PlaceholderError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    if ch != '$' {
      literal.push(ch);
      continue;
    }

    match chars.peek() {
      Some((_, '$')) => {
        chars.next();
        if let Some((_, '{')) = chars.peek() {
          // Escaped: $${ -> ${ (literal)
          chars.next();
          literal.push_str("${");
        } else {
          literal.push_str("$$");
        }
      }
      Some((_, '{')) => {
        chars.next();

        if !literal.is_empty() {
          segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }

        let mut content = String::new();
        let mut found_close = false;
        for (_, c) in chars.by_ref() {
          if c == '}' {
            found_close = true;
            break;
          }
          content.push(c);
        }

        if !found_close {
          return Err(PlaceholderError::Unclosed(pos));
        }

        segments.push(Segment::Placeholder(parse_placeholder_content(content.trim())?));
      }
      _ => literal.push('$'),
    }
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

fn parse_placeholder_content(content: &str) -> Result<Placeholder, PlaceholderError> {
  match content {
    "buildpath" => Ok(Placeholder::BuildPath),
    "prefix" => Ok(Placeholder::Prefix),
    "name" => Ok(Placeholder::Name),
    "version" => Ok(Placeholder::Version),
    other => Category::from_str(other)
      .map(Placeholder::Dir)
      .map_err(|_| PlaceholderError::Unknown(other.to_string())),
  }
}

/// Parse and substitute in one step.
pub fn substitute(input: &str, resolver: &impl Resolver) -> Result<String, PlaceholderError> {
  let segments = parse(input)?;
  substitute_segments(&segments, resolver)
}

/// Substitute placeholders in pre-parsed segments.
pub fn substitute_segments(segments: &[Segment], resolver: &impl Resolver) -> Result<String, PlaceholderError> {
  let mut result = String::new();

  for segment in segments {
    match segment {
      Segment::Literal(s) => result.push_str(s),
      Segment::Placeholder(p) => result.push_str(&resolver.resolve(*p)?),
    }
  }

  Ok(result)
}

/// Check that a template parses, without resolving it.
pub fn validate(input: &str) -> Result<(), PlaceholderError> {
  parse(input).map(|_| ())
}
