//! Configuration file for the filesem CLI.
//!
//! This module defines the Settings struct read from an optional YAML file
//! (`--config PATH` or `FILESEM_CONFIG`). It supports forward-compatible
//! parsing (unknown fields are ignored), defaults for every field, and
//! validation of values. Command-line flags override anything set here.

mod model;
mod operations;


// Re-export public API
pub use model::Settings;
