// src/cli/mod.rs
//! Command-line interface of the engine binary

/// Argument definitions
pub mod commands;

pub use commands::{
    Action, BenchmarkOptions, Commands, ConfigOptions, EngineOptions, HashOptions, SealOptions,
    VerifyOptions,
};
