// src/miner/scheduler.rs
//! Local sealing scheduler
//!
//! `seal` hands the header to the remote sealer (when there is one), starts
//! the configured number of [`Worker`]s from independent random nonces and
//! leaves a runner thread waiting for the first of: the caller's stop signal,
//! a found block, or a thread-count change. A thread-count change aborts the
//! current workers and restarts sealing with the new count.

use crate::engine::pow::PowCore;
use crate::miner::remote::RemoteSealer;
use crate::miner::worker::Worker;
use crate::stats::Meter;
use crate::types::Header;
use crate::utils::error::FrkhashError;
use crate::utils::hexutil;
use crossbeam_channel::{Receiver, Sender, bounded, select};
use log::{debug, error, warn};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

struct MiningState {
    threads: i32,
    rng: Option<StdRng>,
}

enum Wake {
    Stop,
    Found(Option<Header>),
    Update,
}

/// Coordinates local sealing across worker threads
#[derive(Clone)]
pub struct Scheduler {
    core: Arc<PowCore>,
    state: Arc<Mutex<MiningState>>,
    update_tx: Sender<()>,
    update_rx: Receiver<()>,
    meter: Arc<Meter>,
    remote: Option<RemoteSealer>,
}

impl Scheduler {
    /// Creates a new Scheduler instance
    ///
    /// # Arguments
    /// * `core` - Verification core the workers mine against
    /// * `threads` - Worker count (0 = all cores, negative = none)
    /// * `remote` - Remote sealer that also receives every sealing request
    pub fn new(core: Arc<PowCore>, threads: i32, remote: Option<RemoteSealer>) -> Self {
        // rendezvous channel: a change is only delivered to a runner that is
        // waiting for one right now
        let (update_tx, update_rx) = bounded(0);
        Scheduler {
            core,
            state: Arc::new(Mutex::new(MiningState { threads, rng: None })),
            update_tx,
            update_rx,
            meter: Arc::new(Meter::new()),
            remote,
        }
    }

    /// Configured worker count
    pub fn threads(&self) -> i32 {
        self.state.lock().threads
    }

    /// Changes the worker count and nudges an in-flight `seal` to restart
    pub fn set_threads(&self, threads: i32) {
        self.state.lock().threads = threads;
        let _ = self.update_tx.try_send(());
    }

    /// Local hashrate meter
    pub fn meter(&self) -> &Arc<Meter> {
        &self.meter
    }

    /// Remote sealer receiving work, if any
    pub fn remote(&self) -> Option<&RemoteSealer> {
        self.remote.as_ref()
    }

    /// Starts sealing `header` and returns without waiting for a result
    ///
    /// The sealed header is offered to `results` without blocking; `stop`
    /// aborts the search when it yields a message or is disconnected.
    pub fn seal(
        &self,
        header: Header,
        results: Sender<Header>,
        stop: Receiver<()>,
    ) -> Result<(), FrkhashError> {
        let seeds: Vec<u64> = {
            let mut state = self.state.lock();
            let workers = match state.threads {
                0 => num_cpus::get(),
                n if n < 0 => 0,
                n => n as usize,
            };
            let rng = state.rng.get_or_insert_with(StdRng::from_entropy);
            (0..workers).map(|_| rng.next_u64()).collect()
        };

        if let Some(remote) = &self.remote {
            remote.push_work(header.clone(), results.clone())?;
        }

        let abort = Arc::new(AtomicBool::new(false));
        let (found_tx, found_rx) = bounded(seeds.len().max(1));
        let mut handles = Vec::with_capacity(seeds.len());
        for (id, seed) in seeds.into_iter().enumerate() {
            let worker = Worker::new(
                id,
                self.core.clone(),
                self.meter.clone(),
                abort.clone(),
                found_tx.clone(),
            );
            let header = header.clone();
            handles.push(
                thread::Builder::new()
                    .name(format!("frkhash-miner-{}", id))
                    .spawn(move || worker.run(&header, seed))?,
            );
        }
        debug!(
            "Sealing block {} with {} local workers",
            header.number,
            handles.len()
        );

        let this = self.clone();
        thread::Builder::new()
            .name("frkhash-sealer".into())
            .spawn(move || {
                // keeps `found_rx` connected even with zero workers
                let _found_tx = found_tx;
                let wake = select! {
                    recv(stop) -> _ => Wake::Stop,
                    recv(found_rx) -> msg => Wake::Found(msg.ok()),
                    recv(this.update_rx) -> _ => Wake::Update,
                };
                abort.store(true, Ordering::SeqCst);

                match wake {
                    Wake::Stop => {}
                    Wake::Found(Some(sealed)) => {
                        publish(&this.core, sealed, &results);
                    }
                    Wake::Found(None) => {}
                    Wake::Update => {
                        if let Err(e) = this.seal(header, results, stop) {
                            error!("Failed to restart sealing: {}", e);
                        }
                    }
                }
                for handle in handles {
                    let _ = handle.join();
                }
            })?;
        Ok(())
    }
}

/// Hands a locally found block to the caller after checking its seal again
///
/// # Returns
/// `true` when the block passed verification and was delivered
fn publish(core: &PowCore, sealed: Header, results: &Sender<Header>) -> bool {
    let hash = sealed.seal_hash();
    if let Err(e) = core.verify_seal(&sealed, true) {
        error!(
            "Local worker produced an invalid seal: number {} sealhash {} err {}",
            sealed.number,
            hexutil::encode(hash),
            e
        );
        return false;
    }
    if results.try_send(sealed).is_err() {
        warn!(
            "Sealing result is not read by miner: mode local sealhash {}",
            hexutil::encode(hash)
        );
        return false;
    }
    true
}
