// src/epoch/mod.rs
//! Epoch derivation and sizing
//!
//! Blocks are grouped into epochs of [`EPOCH_LENGTH`]. Each epoch has a seed
//! (keccak256 chained `epoch` times over 32 zero bytes) and a cache and
//! dataset whose sizes grow linearly, trimmed so the row count is prime.

/// Per-epoch cache/dataset memo with at-most-once generation
pub mod store;

/// On-disk cache/dataset dumps
pub mod dump;

pub use store::{EpochData, EpochStore};

use crate::miner::algorithm::keccak256;
use crate::types::H256;
use crate::utils::error::FrkhashError;

/// Blocks per epoch
pub const EPOCH_LENGTH: u64 = 30000;
/// Bytes in the dataset at genesis
pub const DATASET_INIT_BYTES: u64 = 1 << 30;
/// Dataset growth per epoch
pub const DATASET_GROWTH_BYTES: u64 = 1 << 23;
/// Bytes in the cache at genesis
pub const CACHE_INIT_BYTES: u64 = 1 << 24;
/// Cache growth per epoch
pub const CACHE_GROWTH_BYTES: u64 = 1 << 17;

/// Cache size used in test mode
pub const TEST_CACHE_BYTES: u64 = 1024;
/// Dataset size used in test mode
pub const TEST_DATASET_BYTES: u64 = 32 * 1024;

/// Highest epoch whose cache and dataset are sized and generated
///
/// Around 550 GiB of dataset; heights beyond it are refused before any sizing.
pub const MAX_EPOCH: u64 = 1 << 16;

/// Epoch a block belongs to
pub fn epoch(block: u64) -> u64 {
    block / EPOCH_LENGTH
}

/// Epoch of `block`, refusing heights beyond [`MAX_EPOCH`]
pub fn checked_epoch(block: u64) -> Result<u64, FrkhashError> {
    let epoch = epoch(block);
    if epoch > MAX_EPOCH {
        return Err(FrkhashError::EpochOutOfRange(block));
    }
    Ok(epoch)
}

/// Seed hash of an epoch
pub fn seed_hash_for_epoch(epoch: u64) -> H256 {
    let mut seed = [0u8; 32];
    for _ in 0..epoch {
        seed = keccak256(&seed);
    }
    seed
}

/// Seed hash of the epoch containing `block`
pub fn seed_hash(block: u64) -> H256 {
    seed_hash_for_epoch(epoch(block))
}

/// Cache size in bytes for an epoch
///
/// Epochs past [`MAX_EPOCH`] are sized as [`MAX_EPOCH`].
pub fn cache_size(epoch: u64) -> u64 {
    let mut size = CACHE_INIT_BYTES + CACHE_GROWTH_BYTES * epoch.min(MAX_EPOCH) - 64;
    while !is_prime(size / 64) {
        size -= 2 * 64;
    }
    size
}

/// Dataset size in bytes for an epoch
///
/// Epochs past [`MAX_EPOCH`] are sized as [`MAX_EPOCH`].
pub fn dataset_size(epoch: u64) -> u64 {
    let mut size = DATASET_INIT_BYTES + DATASET_GROWTH_BYTES * epoch.min(MAX_EPOCH) - 128;
    while !is_prime(size / 128) {
        size -= 2 * 128;
    }
    size
}

fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut i = 3;
    while i <= n / i {
        if n % i == 0 {
            return false;
        }
        i += 2;
    }
    true
}
