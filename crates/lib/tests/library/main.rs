//! Integration tests for pour-lib.

mod common;
mod pipeline_tests;
mod registry_tests;
