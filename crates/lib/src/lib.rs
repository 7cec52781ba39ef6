//! pour-lib: formula resolution and the install pipeline for pour
//!
//! This crate provides the pieces a front end needs to install a formula:
//! - `formula`: parsed, immutable package descriptors and their TOML format
//! - `registry`: a directory of formulas indexed by name and version
//! - `host`: host capability detection and dependency constraint checks
//! - `fetch`: archive download, integrity verification and extraction
//! - `build`: the generic build step executor
//! - `install`: the prefix layout, artifact installation and receipts
//! - `verify`: post-install test commands
//! - `pipeline`: all of the above as one staged, cancellable run

pub mod build;
pub mod config;
pub mod consts;
pub mod error;
pub mod fetch;
pub mod formula;
pub mod host;
pub mod install;
pub mod pipeline;
pub mod placeholder;
pub mod platform;
pub mod prefix_lock;
pub mod registry;
pub mod util;
pub mod verify;
