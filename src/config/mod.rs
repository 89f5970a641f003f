// src/config/mod.rs
//! Configuration management for the frkhash engine
//!
//! This module handles loading, validating and templating the engine
//! configuration. The configuration uses TOML format; every key is optional.

/// Core configuration implementation
///
/// Contains the [`Config`] struct that selects the engine mode, the
/// proof-of-work strategy, memory limits and remote sealer options.
#[allow(clippy::module_inception)]
pub mod config;

// Re-export key items for easy access
pub use config::Config;

use crate::utils::error::FrkhashError;
use std::path::PathBuf;

/// Loads engine configuration from a TOML file
///
/// # Arguments
/// * `path` - Path to the configuration file (anything convertible to PathBuf)
///
/// # Returns
/// * `Ok(Config)` - Successfully loaded configuration
/// * `Err(FrkhashError)` - If the file couldn't be read or parsed
pub fn load(path: impl Into<PathBuf>) -> Result<Config, FrkhashError> {
    Config::load(path)
}

/// Generates a commented configuration template
///
/// # Arguments
/// * `notify` - Whether to include the work notification settings
pub fn generate_template(notify: bool) -> String {
    Config::generate_template(notify)
}
