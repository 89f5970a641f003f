// src/miner/algorithm/ethash.rs
//! Hashimoto over an epoch cache/dataset
//!
//! The cache is filled by chained keccak512 and then run through
//! [`CACHE_ROUNDS`] passes of RandMemoHash. Each dataset item is derived from
//! [`DATASET_PARENTS`] pseudo-randomly selected cache rows. Mining reads
//! 128-byte pages of the dataset; light verification recomputes the same
//! items from the cache on demand.
//!
//! All words are little-endian regardless of host byte order.

use super::{Algorithm, HASH_WORDS, Row, keccak256, keccak512, seed_input};
use crate::epoch;
use crate::types::{AlgorithmType, H256};
use log::debug;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// Width of the mix in bytes
pub const MIX_BYTES: u64 = 128;
/// Hash length in bytes
pub const HASH_BYTES: u64 = 64;
/// Number of parents of each dataset element
pub const DATASET_PARENTS: u32 = 256;
/// Number of rounds in cache production
pub const CACHE_ROUNDS: usize = 3;
/// Number of accesses in the hashimoto loop
pub const LOOP_ACCESSES: usize = 64;

const MIX_WORDS: usize = (MIX_BYTES / 4) as usize;
const FNV_PRIME: u32 = 0x01000193;

/// The memory-hard strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct Ethash;

impl Algorithm for Ethash {
    fn algorithm_type(&self) -> AlgorithmType {
        AlgorithmType::Ethash
    }

    fn needs_lookup(&self) -> bool {
        true
    }

    fn cache_size(&self, epoch: u64) -> u64 {
        epoch::cache_size(epoch)
    }

    fn dataset_size(&self, epoch: u64) -> u64 {
        epoch::dataset_size(epoch)
    }

    fn generate_cache(&self, size: u64, seed: &H256) -> Vec<u32> {
        generate_cache(size, seed)
    }

    fn generate_dataset(&self, size: u64, cache: &[u32]) -> Vec<u32> {
        generate_dataset(size, cache)
    }

    fn dataset_item(&self, cache: &[u32], index: u32) -> Row {
        dataset_item(cache, index)
    }

    fn mix(&self, hash: &H256, nonce: u64, size: u64, lookup: &dyn Fn(u32) -> Row) -> (H256, H256) {
        hashimoto(hash, nonce, size, lookup)
    }
}

/// FNV-1 style combiner used in place of XOR
#[inline]
pub fn fnv(a: u32, b: u32) -> u32 {
    a.wrapping_mul(FNV_PRIME) ^ b
}

#[inline]
fn fnv_hash(mix: &mut [u32], data: &[u32]) {
    for (m, d) in mix.iter_mut().zip(data) {
        *m = fnv(*m, *d);
    }
}

fn words_to_bytes(words: &[u32; HASH_WORDS]) -> [u8; 64] {
    let mut out = [0u8; 64];
    for (chunk, w) in out.chunks_exact_mut(4).zip(words) {
        chunk.copy_from_slice(&w.to_le_bytes());
    }
    out
}

fn bytes_to_words(bytes: &[u8; 64]) -> Row {
    let mut out = [0u32; HASH_WORDS];
    for (w, chunk) in out.iter_mut().zip(bytes.chunks_exact(4)) {
        *w = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    out
}

/// Generates a verification cache of `size` bytes from an epoch seed
///
/// # Arguments
/// * `size` - Cache size in bytes, a multiple of 64
/// * `seed` - Epoch seed hash
///
/// # Returns
/// The cache as little-endian 32-bit words
pub fn generate_cache(size: u64, seed: &H256) -> Vec<u32> {
    let start = Instant::now();
    let rows = (size / HASH_BYTES) as usize;
    if rows == 0 {
        return Vec::new();
    }

    let mut cache = vec![[0u8; 64]; rows];
    cache[0] = keccak512(seed);
    for i in 1..rows {
        cache[i] = keccak512(&cache[i - 1]);
    }

    let mut temp = [0u8; 64];
    for _ in 0..CACHE_ROUNDS {
        for j in 0..rows {
            let src = (j + rows - 1) % rows;
            let head = &cache[j];
            let xor = u32::from_le_bytes([head[0], head[1], head[2], head[3]]) as usize % rows;
            for (k, t) in temp.iter_mut().enumerate() {
                *t = cache[src][k] ^ cache[xor][k];
            }
            cache[j] = keccak512(&temp);
        }
    }

    let words: Vec<u32> = cache
        .iter()
        .flat_map(|row| bytes_to_words(row))
        .collect();
    debug!(
        "Generated cache: {} bytes in {:.2?}",
        size,
        start.elapsed()
    );
    words
}

/// Recomputes dataset item `index` from the cache
pub fn dataset_item(cache: &[u32], index: u32) -> Row {
    let rows = (cache.len() / HASH_WORDS) as u32;
    let offset = (index % rows) as usize * HASH_WORDS;

    let mut mix = [0u32; HASH_WORDS];
    mix.copy_from_slice(&cache[offset..offset + HASH_WORDS]);
    mix[0] ^= index;
    let mut mix = bytes_to_words(&keccak512(&words_to_bytes(&mix)));

    for i in 0..DATASET_PARENTS {
        let parent = fnv(index ^ i, mix[i as usize % HASH_WORDS]) % rows;
        let start = parent as usize * HASH_WORDS;
        fnv_hash(&mut mix, &cache[start..start + HASH_WORDS]);
    }
    bytes_to_words(&keccak512(&words_to_bytes(&mix)))
}

/// Generates the full dataset of `size` bytes, items in parallel
pub fn generate_dataset(size: u64, cache: &[u32]) -> Vec<u32> {
    let start = Instant::now();
    let items = (size / HASH_BYTES) as usize;
    let mut dataset = vec![0u32; items * HASH_WORDS];

    let done = AtomicUsize::new(0);
    let step = (items / 10).max(1);
    dataset
        .par_chunks_mut(HASH_WORDS)
        .enumerate()
        .for_each(|(i, item)| {
            item.copy_from_slice(&dataset_item(cache, i as u32));
            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
            if n % step == 0 {
                debug!("Generating dataset: {}%", n * 100 / items);
            }
        });

    debug!(
        "Generated dataset: {} bytes in {:.2?}",
        size,
        start.elapsed()
    );
    dataset
}

/// The hashimoto loop
///
/// `size` is the dataset size in bytes; `lookup` returns dataset items either
/// from a stored dataset or recomputed from the cache.
pub fn hashimoto(hash: &H256, nonce: u64, size: u64, lookup: &dyn Fn(u32) -> Row) -> (H256, H256) {
    let rows = (size / MIX_BYTES) as u32;

    let seed = keccak512(&seed_input(hash, nonce));
    let seed_words = bytes_to_words(&seed);
    let seed_head = seed_words[0];

    let mut mix = [0u32; MIX_WORDS];
    for (i, m) in mix.iter_mut().enumerate() {
        *m = seed_words[i % HASH_WORDS];
    }

    let mut temp = [0u32; MIX_WORDS];
    for i in 0..LOOP_ACCESSES {
        let parent = fnv(i as u32 ^ seed_head, mix[i % MIX_WORDS]) % rows;
        for (j, page) in temp.chunks_exact_mut(HASH_WORDS).enumerate() {
            page.copy_from_slice(&lookup(2 * parent + j as u32));
        }
        fnv_hash(&mut mix, &temp);
    }

    let mut digest = [0u8; 32];
    for (i, chunk) in digest.chunks_exact_mut(4).enumerate() {
        let w = &mix[i * 4..i * 4 + 4];
        chunk.copy_from_slice(&fnv(fnv(fnv(w[0], w[1]), w[2]), w[3]).to_le_bytes());
    }

    let mut result_input = [0u8; 96];
    result_input[..64].copy_from_slice(&seed);
    result_input[64..].copy_from_slice(&digest);
    (digest, keccak256(&result_input))
}

/// Hashimoto against a cache only, recomputing every item it touches
pub fn hashimoto_light(size: u64, cache: &[u32], hash: &H256, nonce: u64) -> (H256, H256) {
    hashimoto(hash, nonce, size, &|index| dataset_item(cache, index))
}

/// Hashimoto against a fully generated dataset
pub fn hashimoto_full(dataset: &[u32], hash: &H256, nonce: u64) -> (H256, H256) {
    let size = (dataset.len() * 4) as u64;
    hashimoto(hash, nonce, size, &|index| {
        let start = index as usize * HASH_WORDS;
        let mut row = [0u32; HASH_WORDS];
        row.copy_from_slice(&dataset[start..start + HASH_WORDS]);
        row
    })
}
