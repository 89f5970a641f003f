// src/miner/mod.rs
//! Proof-of-work mining and sealing
//!
//! This module contains everything that turns headers into seals:
//! - Algorithm implementations (hashimoto, frankomoto)
//! - Difficulty/target arithmetic
//! - Local sealing with worker threads
//! - The remote sealer serving external miners

/// Proof-of-work strategies
pub mod algorithm;

/// Difficulty to target conversion
pub mod difficulty;

/// Local sealing scheduler
///
/// Starts workers for a header, publishes the first found seal and restarts
/// when the thread count changes.
pub mod scheduler;

/// Worker thread implementation
///
/// Searches nonces from a random start until it finds one or is aborted.
pub mod worker;

/// Remote sealer actor
///
/// Single-owner loop tracking work handed out to external miners, their
/// submissions and reported hashrates.
pub mod remote;

// Re-export main components for cleaner imports
pub use self::algorithm::Algorithm;
pub use self::remote::{RemoteSealer, Solution, WorkPackage};
pub use self::scheduler::Scheduler;
pub use self::worker::Worker;
