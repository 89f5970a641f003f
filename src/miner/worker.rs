// src/miner/worker.rs
//! Local nonce search
//!
//! One worker walks the nonce space upwards from a random seed until it finds
//! a nonce meeting the target or the shared abort flag is raised. The flag is
//! polled before every attempt, so cancellation latency is one hash.

use crate::engine::pow::PowCore;
use crate::stats::Meter;
use crate::types::{BlockNonce, Header};
use crossbeam_channel::Sender;
use log::{trace, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Attempts between hashrate meter updates
pub const METER_BATCH: u64 = 1 << 15;

/// Worker thread that searches nonces for one header
pub struct Worker {
    id: usize,
    core: Arc<PowCore>,
    meter: Arc<Meter>,
    abort: Arc<AtomicBool>,
    found: Sender<Header>,
}

impl Worker {
    /// Creates a new Worker instance
    ///
    /// # Arguments
    /// * `id` - Index used in log lines
    /// * `core` - Verification core providing the mining dataset
    /// * `meter` - Hashrate meter marked with the attempts made
    /// * `abort` - Raised by the scheduler to stop the search
    /// * `found` - Receives the sealed header when a nonce is found
    pub fn new(
        id: usize,
        core: Arc<PowCore>,
        meter: Arc<Meter>,
        abort: Arc<AtomicBool>,
        found: Sender<Header>,
    ) -> Self {
        Worker {
            id,
            core,
            meter,
            abort,
            found,
        }
    }

    /// Searches nonces for `header` starting at `seed`
    pub fn run(&self, header: &Header, seed: u64) {
        let ctx = match self.core.mining_context(header) {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!("Miner {} cannot seal block {}: {}", self.id, header.number, e);
                return;
            }
        };

        trace!("Miner {} started search for new nonces, seed {}", self.id, seed);
        let mut attempts = 0u64;
        let mut nonce = seed;
        loop {
            if self.abort.load(Ordering::Relaxed) {
                trace!("Miner {} nonce search aborted after {} attempts", self.id, attempts);
                break;
            }
            attempts += 1;
            if attempts % METER_BATCH == 0 {
                self.meter.mark(attempts);
                attempts = 0;
            }
            if let Some(digest) = ctx.try_nonce(nonce) {
                let sealed = header.with_seal(BlockNonce::from_u64(nonce), digest);
                match self.found.try_send(sealed) {
                    Ok(()) => trace!("Miner {} nonce found and reported: {}", self.id, nonce),
                    Err(_) => trace!("Miner {} nonce found but discarded: {}", self.id, nonce),
                }
                break;
            }
            nonce = nonce.wrapping_add(1);
        }
        self.meter.mark(attempts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::pow::CoreOptions;
    use crate::miner::algorithm::Ethash;
    use crate::types::{PowMode, U256};
    use crossbeam_channel::bounded;

    fn worker(abort: Arc<AtomicBool>, found: Sender<Header>) -> (Worker, Arc<PowCore>, Arc<Meter>) {
        let core = Arc::new(PowCore::new(PowMode::Test, Arc::new(Ethash), CoreOptions::default()));
        let meter = Arc::new(Meter::new());
        (Worker::new(0, core.clone(), meter.clone(), abort, found), core, meter)
    }

    #[test]
    fn finds_a_verifiable_nonce() {
        let (tx, rx) = bounded(1);
        let (worker, core, meter) = worker(Arc::new(AtomicBool::new(false)), tx);
        let header = Header {
            number: 1,
            difficulty: U256::from(100u64),
            ..Default::default()
        };
        worker.run(&header, 12345);

        let sealed = rx.try_recv().unwrap();
        assert_eq!(sealed.seal_hash(), header.seal_hash());
        assert!(sealed.nonce.as_u64() >= 12345);
        assert!(core.verify_seal(&sealed, false).is_ok());
        assert_eq!(meter.count(), sealed.nonce.as_u64() - 12345 + 1);
    }

    #[test]
    fn raised_abort_stops_immediately() {
        let (tx, rx) = bounded(1);
        let (worker, _core, meter) = worker(Arc::new(AtomicBool::new(true)), tx);
        let header = Header {
            number: 1,
            difficulty: U256::MAX,
            ..Default::default()
        };
        worker.run(&header, 0);
        assert!(rx.try_recv().is_err());
        assert_eq!(meter.count(), 0);
    }
}
