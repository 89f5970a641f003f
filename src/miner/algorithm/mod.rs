// src/miner/algorithm/mod.rs
//! Proof-of-work strategies
//!
//! Every strategy turns a sealing hash and a nonce into a `(digest, result)`
//! pair. The memory-hard one additionally defines how big the per-epoch cache
//! and dataset are and how they are derived; the engine owns their storage and
//! hands the strategy a row lookup at mixing time.
//!
//! Currently implements:
//! - [`Ethash`]: hashimoto over an epoch cache (light) or dataset (full)
//! - [`Frankomoto`]: the two-hash keccak variant

/// Memory-hard hashimoto with cache/dataset generation
pub mod ethash;

/// Lookup-free keccak variant
pub mod frankomoto;

pub use ethash::Ethash;
pub use frankomoto::Frankomoto;

use crate::types::{AlgorithmType, H256};
use sha3::{Digest, Keccak256, Keccak512};
use std::sync::Arc;

/// Number of 32-bit words in a cache row or dataset item
pub const HASH_WORDS: usize = 16;

/// One 64-byte cache row or dataset item, as little-endian words
pub type Row = [u32; HASH_WORDS];

/// Common interface for all proof-of-work strategies
///
/// Implementations are stateless; the per-epoch data they need is passed in
/// by the caller so one instance can serve every epoch concurrently.
pub trait Algorithm: Send + Sync {
    /// Get the algorithm type
    fn algorithm_type(&self) -> AlgorithmType;

    /// Whether `mix` reads from a cache or dataset at all
    fn needs_lookup(&self) -> bool {
        false
    }

    /// Cache size in bytes for the given epoch (0 when no cache is used)
    fn cache_size(&self, _epoch: u64) -> u64 {
        0
    }

    /// Dataset size in bytes for the given epoch (0 when no dataset is used)
    fn dataset_size(&self, _epoch: u64) -> u64 {
        0
    }

    /// Derives a cache of `size` bytes from an epoch seed
    fn generate_cache(&self, _size: u64, _seed: &H256) -> Vec<u32> {
        Vec::new()
    }

    /// Derives the complete dataset of `size` bytes from a cache
    fn generate_dataset(&self, _size: u64, _cache: &[u32]) -> Vec<u32> {
        Vec::new()
    }

    /// Recomputes one dataset item from the cache
    fn dataset_item(&self, _cache: &[u32], _index: u32) -> Row {
        [0; HASH_WORDS]
    }

    /// Runs the puzzle for one nonce
    ///
    /// # Arguments
    /// * `hash` - Sealing hash of the header
    /// * `nonce` - Candidate nonce
    /// * `size` - Dataset size in bytes, bounding the lookup index space
    /// * `lookup` - Returns dataset item `index`, either stored or recomputed
    ///
    /// # Returns
    /// `(digest, result)`; `result` is compared big-endian against the target
    fn mix(&self, hash: &H256, nonce: u64, size: u64, lookup: &dyn Fn(u32) -> Row) -> (H256, H256);
}

/// Creates the strategy for an algorithm type
pub fn new_algorithm(kind: AlgorithmType) -> Arc<dyn Algorithm> {
    match kind {
        AlgorithmType::Ethash => Arc::new(Ethash),
        AlgorithmType::Frankomoto => Arc::new(Frankomoto),
    }
}

/// Keccak-256 (legacy padding, not SHA3-256)
pub fn keccak256(data: &[u8]) -> H256 {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

/// Keccak-512 (legacy padding, not SHA3-512)
pub fn keccak512(data: &[u8]) -> [u8; 64] {
    let mut out = [0u8; 64];
    out.copy_from_slice(&Keccak512::digest(data));
    out
}

/// Concatenates the 32-byte hash and the little-endian nonce
pub(crate) fn seed_input(hash: &H256, nonce: u64) -> [u8; 40] {
    let mut input = [0u8; 40];
    input[..32].copy_from_slice(hash);
    input[32..].copy_from_slice(&nonce.to_le_bytes());
    input
}
