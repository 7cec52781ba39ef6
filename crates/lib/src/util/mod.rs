//! Shared utilities.
//!
//! Hashing plus test helpers for building fixture archives.

pub mod hash;

#[cfg(test)]
pub mod testutil;
