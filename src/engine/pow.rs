// src/engine/pow.rs
//! Verification core shared by the engine, its local workers and the remote
//! sealer
//!
//! Owns the proof-of-work strategy and the per-epoch cache/dataset memo.
//! Everything here is immutable after construction apart from the memo
//! itself, so one `Arc<PowCore>` is handed to every thread that needs to hash.

use crate::epoch::{self, EpochData, EpochStore, dump};
use crate::miner::algorithm::{Algorithm, HASH_WORDS, Row};
use crate::miner::difficulty::{difficulty_to_target, result_meets_target};
use crate::types::{H256, Header, PowMode, U256};
use crate::utils::error::FrkhashError;
use log::{debug, error, info, trace, warn};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Construction parameters of a [`PowCore`]
#[derive(Debug, Clone, Default)]
pub struct CoreOptions {
    /// Cache epochs kept in memory
    pub caches_in_mem: usize,
    /// Dataset epochs kept in memory
    pub datasets_in_mem: usize,
    /// Where cache dumps are read from and written to
    pub cache_dir: Option<PathBuf>,
    /// Where dataset dumps are read from and written to
    pub dataset_dir: Option<PathBuf>,
    /// Block number the fake modes reject
    pub fake_fail: Option<u64>,
    /// Time the fake modes sleep before answering
    pub fake_delay: Option<Duration>,
}

/// Mode-aware seal verification plus cache/dataset management
pub struct PowCore {
    mode: PowMode,
    algorithm: Arc<dyn Algorithm>,
    caches: EpochStore,
    datasets: EpochStore,
    options: CoreOptions,
}

impl PowCore {
    /// Creates a core for `mode`
    ///
    /// `mode` is never [`PowMode::Shared`]: shared engines borrow the core of
    /// the process-wide instance instead of building their own.
    pub fn new(mode: PowMode, algorithm: Arc<dyn Algorithm>, options: CoreOptions) -> Self {
        PowCore {
            mode,
            algorithm,
            caches: EpochStore::new("cache", options.caches_in_mem),
            datasets: EpochStore::new("dataset", options.datasets_in_mem),
            options,
        }
    }

    /// Mode this core verifies in
    pub fn mode(&self) -> PowMode {
        self.mode
    }

    /// The proof-of-work strategy
    pub fn algorithm(&self) -> &Arc<dyn Algorithm> {
        &self.algorithm
    }

    /// Cache size in bytes for an epoch, honouring test mode
    pub fn cache_size(&self, epoch: u64) -> u64 {
        match self.mode {
            PowMode::Test => epoch::TEST_CACHE_BYTES,
            _ => self.algorithm.cache_size(epoch),
        }
    }

    /// Dataset size in bytes for an epoch, honouring test mode
    pub fn dataset_size(&self, epoch: u64) -> u64 {
        match self.mode {
            PowMode::Test => epoch::TEST_DATASET_BYTES,
            _ => self.algorithm.dataset_size(epoch),
        }
    }

    /// Returns the generated verification cache for the epoch of `block`
    pub fn cache(&self, block: u64) -> Arc<EpochData> {
        let epoch = epoch::epoch(block);
        let size = self.cache_size(epoch);
        let item = self.caches.get(epoch, size);
        item.get_or_generate(|| {
            let seed = epoch::seed_hash_for_epoch(epoch);
            self.load_or_generate("cache", self.options.cache_dir.as_deref(), &seed, size, || {
                self.algorithm.generate_cache(size, &seed)
            })
        });
        item
    }

    /// Returns the generated mining dataset for the epoch of `block`
    pub fn dataset(&self, block: u64) -> Arc<EpochData> {
        let epoch = epoch::epoch(block);
        let size = self.dataset_size(epoch);
        let item = self.datasets.get(epoch, size);
        item.get_or_generate(|| {
            let seed = epoch::seed_hash_for_epoch(epoch);
            self.load_or_generate("full", self.options.dataset_dir.as_deref(), &seed, size, || {
                let cache = self.cache(block);
                let start = Instant::now();
                info!("Generating DAG for epoch {} ({} bytes)", epoch, size);
                let words = self
                    .algorithm
                    .generate_dataset(size, cache.get().unwrap_or_default());
                info!("Generated DAG for epoch {} in {:.2?}", epoch, start.elapsed());
                words
            })
        });
        item
    }

    fn load_or_generate<F: FnOnce() -> Vec<u32>>(
        &self,
        kind: &str,
        dir: Option<&Path>,
        seed: &H256,
        size: u64,
        generate: F,
    ) -> Vec<u32> {
        let Some(dir) = dir else {
            return generate();
        };
        let path = dump::dump_path(dir, kind, seed);
        match dump::load(&path, (size / 4) as usize) {
            Ok(words) => {
                debug!("Loaded {} dump from {}", kind, path.display());
                return words;
            }
            Err(FrkhashError::IoError(e)) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Discarding {} dump {}: {}", kind, path.display(), e),
        }

        let words = generate();
        match dump::store(&path, &words) {
            Ok(()) => debug!("Stored {} dump at {}", kind, path.display()),
            Err(e) => error!("Failed to store {} dump {}: {}", kind, path.display(), e),
        }
        words
    }

    /// Runs the puzzle for `hash`/`nonce` at height `number`
    ///
    /// With `fulldag` the stored dataset is used when that epoch's dataset
    /// has already been generated; otherwise items are recomputed from the
    /// cache.
    ///
    /// # Returns
    /// * `Ok((digest, result))`
    /// * `Err(FrkhashError::EpochOutOfRange)` - `number` is past the last
    ///   epoch a memory-hard strategy can size
    pub fn compute(
        &self,
        number: u64,
        hash: &H256,
        nonce: u64,
        fulldag: bool,
    ) -> Result<(H256, H256), FrkhashError> {
        if !self.algorithm.needs_lookup() {
            return Ok(self.algorithm.mix(hash, nonce, 0, &|_| [0; HASH_WORDS]));
        }
        let epoch = epoch::checked_epoch(number)?;
        let size = self.dataset_size(epoch);

        if fulldag {
            if let Some(dataset) = self.datasets.peek(epoch) {
                if let Some(words) = dataset.get() {
                    return Ok(self.algorithm.mix(hash, nonce, size, &|i| row_at(words, i)));
                }
            }
        }

        let cache = self.cache(number);
        let words = cache.get().unwrap_or_default();
        Ok(self
            .algorithm
            .mix(hash, nonce, size, &|i| self.algorithm.dataset_item(words, i)))
    }

    /// Checks the seal of `header`
    ///
    /// # Returns
    /// * `Ok(())` - the seal is acceptable in this mode
    /// * `Err(FrkhashError::InvalidDifficulty)` - difficulty is zero
    /// * `Err(FrkhashError::InvalidProofOfWork)` - digest or result is wrong,
    ///   or this is the configured failing block of a fake engine
    pub fn verify_seal(&self, header: &Header, fulldag: bool) -> Result<(), FrkhashError> {
        match self.mode {
            PowMode::FullFake => return Ok(()),
            PowMode::Fake => {
                if let Some(delay) = self.options.fake_delay {
                    std::thread::sleep(delay);
                }
                if self.options.fake_fail == Some(header.number) {
                    return Err(FrkhashError::InvalidProofOfWork);
                }
                return Ok(());
            }
            PowMode::Normal | PowMode::Shared | PowMode::Test => {}
        }

        let target = difficulty_to_target(&header.difficulty)?;
        let (digest, result) = self.compute(
            header.number,
            &header.seal_hash(),
            header.nonce.as_u64(),
            fulldag,
        )?;
        if digest != header.mix_digest {
            trace!("Mix digest mismatch for block {}", header.number);
            return Err(FrkhashError::InvalidProofOfWork);
        }
        if !result_meets_target(&result, &target) {
            trace!("Result above target for block {}", header.number);
            return Err(FrkhashError::InvalidProofOfWork);
        }
        Ok(())
    }

    /// Prepares everything a local worker needs to search nonces for `header`
    ///
    /// Generates the full dataset when the strategy needs one.
    pub fn mining_context(&self, header: &Header) -> Result<MiningContext, FrkhashError> {
        let target = difficulty_to_target(&header.difficulty)?;
        let (epoch, dataset) = if self.algorithm.needs_lookup() {
            let epoch = epoch::checked_epoch(header.number)?;
            (epoch, Some(self.dataset(header.number)))
        } else {
            (epoch::epoch(header.number), None)
        };
        Ok(MiningContext {
            algorithm: self.algorithm.clone(),
            hash: header.seal_hash(),
            target,
            size: self.dataset_size(epoch),
            dataset,
        })
    }
}

fn row_at(words: &[u32], index: u32) -> Row {
    let start = index as usize * HASH_WORDS;
    let mut row = [0u32; HASH_WORDS];
    row.copy_from_slice(&words[start..start + HASH_WORDS]);
    row
}

/// Per-header state for the nonce search loop
pub struct MiningContext {
    algorithm: Arc<dyn Algorithm>,
    hash: H256,
    target: U256,
    size: u64,
    dataset: Option<Arc<EpochData>>,
}

impl MiningContext {
    /// Sealing hash being searched
    pub fn hash(&self) -> &H256 {
        &self.hash
    }

    /// Tries one nonce, returning its mix digest when the result meets the target
    pub fn try_nonce(&self, nonce: u64) -> Option<H256> {
        let (digest, result) = match self.dataset.as_ref().and_then(|d| d.get()) {
            Some(words) => self
                .algorithm
                .mix(&self.hash, nonce, self.size, &|i| row_at(words, i)),
            None => self
                .algorithm
                .mix(&self.hash, nonce, self.size, &|_| [0; HASH_WORDS]),
        };
        result_meets_target(&result, &self.target).then_some(digest)
    }
}
