// src/utils/mod.rs
//! Utilities module for common functionality
//!
//! Error handling, logging setup and the `0x`-prefixed hex helpers used by
//! the RPC façade, the header types and the command line.

/// Error types and handling utilities
///
/// Contains the [`FrkhashError`] enum which defines all error conditions of
/// the engine, along with conversion implementations.
pub mod error;

/// Logging configuration and utilities
pub mod logging;

/// `0x`-prefixed hex encoding, decoding and serde adapters
pub mod hexutil;

// Re-export for easier access
pub use error::FrkhashError;
pub use logging::init_logging;
