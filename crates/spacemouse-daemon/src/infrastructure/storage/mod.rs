//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads and writes `config.toml` in the platform
//! config directory and falls back to defaults when the file does not exist
//! yet (first run).

pub mod config;
