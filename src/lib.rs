//! frkhash - Ethash-family proof-of-work consensus engine in Rust
//!
//! This crate provides a complete proof-of-work engine with support for:
//! - The memory-hard hashimoto puzzle and the lightweight frankomoto variant
//! - Epoch caches and mining datasets, memoized in memory and dumped to disk
//! - Local sealing across worker threads
//! - A remote sealer serving getWork/submitWork to external miners
//! - Test and fake modes for chains that do not need real work

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Consensus engine and its verification core
pub mod engine;

/// Epoch arithmetic, cache/dataset memo and dumps
pub mod epoch;

/// Proof-of-work algorithms, local and remote sealing
pub mod miner;

/// RPC façade and work notifications
pub mod network;

/// Hashrate statistics
pub mod stats;

/// Utility functions and error handling
pub mod utils;

/// Command-line interface definitions
pub mod cli;

/// Configuration management
pub mod config;

/// Shared type definitions
pub mod types;

// Core exports
pub use cli::Commands;
pub use config::Config;
pub use engine::{Engine, Lifecycle};
pub use miner::{Algorithm, RemoteSealer, Scheduler, Solution, WorkPackage, Worker};
pub use network::{Api, ApiDescriptor, Notifier};
pub use stats::{Meter, MeterSnapshot};
pub use types::{AlgorithmType, BlockNonce, H256, Header, PowMode, U256};
pub use utils::{FrkhashError, init_logging};
