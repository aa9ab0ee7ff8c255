//! Shared test doubles for the flowctx crates.

pub mod common;
pub mod support;
