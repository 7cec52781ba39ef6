//! Formula descriptors.
//!
//! A formula describes one version of one package: where its source lives,
//! the digest that source must have, what the host must provide, the ordered
//! build steps, where the build outputs go, and how to smoke-test the result.
//!
//! # Submodules
//!
//! - [`parse`] - TOML front-end and validation
//! - [`version`] - lenient dotted versions and URL version inference

pub mod parse;
mod types;
pub mod version;

pub use types::*;
pub use version::Version;
