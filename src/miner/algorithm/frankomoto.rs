// src/miner/algorithm/frankomoto.rs
//! Lookup-free keccak variant
//!
//! `seed = keccak512(hash ‖ nonce_le)`, the digest is the upper half of the
//! seed and the result is `keccak256(seed)`. No cache or dataset is involved,
//! so verification and mining cost the same two hash calls.

use super::{Algorithm, Row, keccak256, keccak512, seed_input};
use crate::types::{AlgorithmType, H256};

/// The two-hash strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct Frankomoto;

impl Algorithm for Frankomoto {
    fn algorithm_type(&self) -> AlgorithmType {
        AlgorithmType::Frankomoto
    }

    fn mix(&self, hash: &H256, nonce: u64, _size: u64, _lookup: &dyn Fn(u32) -> Row) -> (H256, H256) {
        frankomoto(hash, nonce)
    }
}

/// Computes `(digest, result)` for one nonce
pub fn frankomoto(hash: &H256, nonce: u64) -> (H256, H256) {
    let seed = keccak512(&seed_input(hash, nonce));
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&seed[32..]);
    (digest, keccak256(&seed))
}
