// src/miner/remote.rs
//! Remote sealer
//!
//! A single thread owns all state about work handed to external miners:
//! outstanding packages keyed by sealing hash, reported hashrates and the
//! sink for found blocks. Callers talk to it only through a bounded request
//! queue and per-request reply channels, so the state itself needs no lock
//! and requests are answered strictly in arrival order.

use crate::engine::pow::PowCore;
use crate::epoch;
use crate::miner::difficulty::difficulty_to_target;
use crate::network::notify::Notifier;
use crate::types::{BlockNonce, H256, Header, U256};
use crate::utils::error::FrkhashError;
use crate::utils::hexutil;
use crossbeam_channel::{Receiver, Sender, bounded, select, tick};
use log::{debug, info, trace, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Blocks behind the current one after which work is dropped
pub const STALE_THRESHOLD: u64 = 7;

/// How long a reported hashrate counts towards the aggregate
pub const HASHRATE_EXPIRY: Duration = Duration::from_secs(10);

/// Interval of the stale-work sweep
pub const PRUNE_INTERVAL: Duration = Duration::from_secs(5);

const REQUEST_QUEUE: usize = 64;

/// Work handed out to remote miners
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkPackage {
    /// Sealing hash of the header
    pub seal_hash: H256,
    /// Seed hash of the header's epoch
    pub seed_hash: H256,
    /// Boundary the result must not exceed
    pub target: U256,
    /// Block number
    pub number: u64,
}

impl WorkPackage {
    /// Builds the package for a header
    pub fn from_header(header: &Header) -> Result<Self, FrkhashError> {
        Ok(WorkPackage {
            seal_hash: header.seal_hash(),
            seed_hash: epoch::seed_hash_for_epoch(epoch::checked_epoch(header.number)?),
            target: difficulty_to_target(&header.difficulty)?,
            number: header.number,
        })
    }

    /// The `[sealHash, seedHash, target, number]` strings remote miners expect
    ///
    /// The target is zero-padded to 32 bytes; the number is a hex quantity.
    pub fn to_strings(&self) -> [String; 4] {
        [
            hexutil::encode(self.seal_hash),
            hexutil::encode(self.seed_hash),
            hexutil::encode(hexutil::u256_be_bytes(&self.target)),
            hexutil::encode_u64(self.number),
        ]
    }
}

/// A nonce found by a remote miner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Solution {
    /// Winning nonce
    pub nonce: BlockNonce,
    /// Sealing hash of the package it solves
    pub seal_hash: H256,
    /// Mix digest computed by the miner
    pub mix_digest: H256,
}

/// A hashrate reported by one remote miner
#[derive(Debug, Clone, Copy)]
pub struct HashrateEntry {
    /// Miner-chosen identifier
    pub id: H256,
    /// Hashes per second
    pub rate: u64,
    /// Time of the last report
    pub refreshed: Instant,
}

enum Request {
    PushWork {
        header: Header,
        results: Sender<Header>,
    },
    FetchWork {
        reply: Sender<Result<WorkPackage, FrkhashError>>,
    },
    SubmitWork {
        solution: Solution,
        reply: Sender<bool>,
    },
    SubmitHashrate {
        id: H256,
        rate: u64,
        reply: Sender<bool>,
    },
    FetchHashrate {
        reply: Sender<u64>,
    },
}

impl Request {
    fn reject(self) {
        match self {
            Request::PushWork { .. } => {}
            Request::FetchWork { reply } => {
                let _ = reply.send(Err(FrkhashError::EngineStopped));
            }
            Request::SubmitWork { reply, .. } | Request::SubmitHashrate { reply, .. } => {
                let _ = reply.send(false);
            }
            Request::FetchHashrate { reply } => {
                drop(reply);
            }
        }
    }
}

/// Options of the remote sealer loop
pub struct RemoteOptions {
    /// Notification endpoints, if any
    pub notifier: Option<Notifier>,
    /// Deliver submissions without checking the proof-of-work
    pub noverify: bool,
}

/// Handle to the remote sealer thread
///
/// Cheap to clone; every clone talks to the same loop.
#[derive(Clone)]
pub struct RemoteSealer {
    requests: Sender<Request>,
    shutdown: Arc<Mutex<Option<Sender<()>>>>,
    exited: Receiver<()>,
}

impl RemoteSealer {
    /// Starts the sealer loop on its own thread
    pub fn start(core: Arc<PowCore>, options: RemoteOptions) -> Result<Self, FrkhashError> {
        let (requests_tx, requests_rx) = bounded(REQUEST_QUEUE);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let (exited_tx, exited_rx) = bounded::<()>(0);

        let state = SealerLoop {
            core,
            notifier: options.notifier,
            noverify: options.noverify,
            current: None,
            current_work: None,
            results: None,
            works: HashMap::new(),
            rates: HashMap::new(),
        };
        thread::Builder::new()
            .name("frkhash-remote".into())
            .spawn(move || {
                state.run(requests_rx, shutdown_rx);
                drop(exited_tx);
            })?;

        Ok(RemoteSealer {
            requests: requests_tx,
            shutdown: Arc::new(Mutex::new(Some(shutdown_tx))),
            exited: exited_rx,
        })
    }

    /// Makes `header` the current work; found blocks go to `results`
    pub fn push_work(&self, header: Header, results: Sender<Header>) -> Result<(), FrkhashError> {
        self.requests
            .send(Request::PushWork { header, results })
            .map_err(|_| FrkhashError::EngineStopped)
    }

    /// The most recently pushed work package
    ///
    /// # Returns
    /// * `Err(FrkhashError::NoMiningWork)` - nothing was pushed yet
    /// * `Err(FrkhashError::EngineStopped)` - the sealer has exited
    pub fn current_work(&self) -> Result<WorkPackage, FrkhashError> {
        let (reply, answer) = bounded(1);
        self.requests
            .send(Request::FetchWork { reply })
            .map_err(|_| FrkhashError::EngineStopped)?;
        answer.recv()?
    }

    /// Submits a solution, returning whether it was accepted and delivered
    pub fn submit_work(&self, solution: Solution) -> bool {
        let (reply, answer) = bounded(1);
        if self
            .requests
            .send(Request::SubmitWork { solution, reply })
            .is_err()
        {
            return false;
        }
        answer.recv().unwrap_or(false)
    }

    /// Records the hashrate of a remote miner
    pub fn submit_hashrate(&self, id: H256, rate: u64) -> bool {
        let (reply, answer) = bounded(1);
        if self
            .requests
            .send(Request::SubmitHashrate { id, rate, reply })
            .is_err()
        {
            return false;
        }
        answer.recv().unwrap_or(false)
    }

    /// Sum of all hashrates reported within the expiry window
    pub fn aggregate_hashrate(&self) -> Result<u64, FrkhashError> {
        let (reply, answer) = bounded(1);
        self.requests
            .send(Request::FetchHashrate { reply })
            .map_err(|_| FrkhashError::EngineStopped)?;
        Ok(answer.recv()?)
    }

    /// Stops the loop and waits until it has exited
    ///
    /// Safe to call from several threads at once. Returns `true` only for
    /// the caller that actually requested the shutdown.
    pub fn stop(&self) -> bool {
        let signal = self.shutdown.lock().take();
        let initiated = signal.is_some();
        drop(signal);
        // the loop drops its end of `exited` on the way out
        let _ = self.exited.recv();
        initiated
    }
}

struct SealerLoop {
    core: Arc<PowCore>,
    notifier: Option<Notifier>,
    noverify: bool,
    current: Option<Header>,
    current_work: Option<WorkPackage>,
    results: Option<Sender<Header>>,
    works: HashMap<H256, Header>,
    rates: HashMap<H256, HashrateEntry>,
}

impl SealerLoop {
    fn run(mut self, requests: Receiver<Request>, shutdown: Receiver<()>) {
        let ticker = tick(PRUNE_INTERVAL);
        loop {
            select! {
                recv(requests) -> msg => match msg {
                    Ok(request) => self.handle(request),
                    Err(_) => break,
                },
                recv(ticker) -> _ => self.prune(),
                recv(shutdown) -> _ => break,
            }
        }

        // answer whatever is still queued, then drop the queue
        while let Ok(request) = requests.try_recv() {
            request.reject();
        }
        info!("Remote sealer stopped");
    }

    fn handle(&mut self, request: Request) {
        match request {
            Request::PushWork { header, results } => {
                self.results = Some(results);
                self.make_work(header);
            }
            Request::FetchWork { reply } => {
                let work = self
                    .current_work
                    .clone()
                    .ok_or(FrkhashError::NoMiningWork);
                let _ = reply.send(work);
            }
            Request::SubmitWork { solution, reply } => {
                let accepted = self.submit_work(&solution);
                let _ = reply.send(accepted);
            }
            Request::SubmitHashrate { id, rate, reply } => {
                self.rates.insert(
                    id,
                    HashrateEntry {
                        id,
                        rate,
                        refreshed: Instant::now(),
                    },
                );
                let _ = reply.send(true);
            }
            Request::FetchHashrate { reply } => {
                self.rates
                    .retain(|_, entry| entry.refreshed.elapsed() <= HASHRATE_EXPIRY);
                let total = self.rates.values().map(|entry| entry.rate).sum();
                let _ = reply.send(total);
            }
        }
    }

    fn make_work(&mut self, header: Header) {
        let work = match WorkPackage::from_header(&header) {
            Ok(work) => work,
            Err(e) => {
                warn!("Refusing remote work for block {}: {}", header.number, e);
                return;
            }
        };
        debug!(
            "New remote work: number {} sealhash {}",
            work.number,
            hexutil::encode(work.seal_hash)
        );
        // a package for the same number is superseded, not removed
        self.works.insert(work.seal_hash, header.clone());
        if let Some(notifier) = &self.notifier {
            notifier.notify(&work, &header);
        }
        self.current = Some(header);
        self.current_work = Some(work);
    }

    fn submit_work(&mut self, solution: &Solution) -> bool {
        let Some(current) = &self.current else {
            warn!("No current work when remote solution arrived");
            return false;
        };
        let Some(header) = self.works.get(&solution.seal_hash) else {
            warn!(
                "Work submitted but none pending: sealhash {}",
                hexutil::encode(solution.seal_hash)
            );
            return false;
        };

        let number = header.number;
        let sealed = header.with_seal(solution.nonce, solution.mix_digest);
        if !self.noverify {
            let start = Instant::now();
            if let Err(e) = self.core.verify_seal(&sealed, true) {
                warn!(
                    "Invalid proof-of-work submitted: sealhash {} err {}",
                    hexutil::encode(solution.seal_hash),
                    e
                );
                return false;
            }
            trace!("Verified remote proof-of-work in {:.2?}", start.elapsed());
        }

        if number + STALE_THRESHOLD <= current.number {
            warn!(
                "Work submitted is too old: number {} sealhash {}",
                number,
                hexutil::encode(solution.seal_hash)
            );
            return false;
        }

        let Some(results) = &self.results else {
            warn!("Remote solution arrived without a result sink");
            return false;
        };
        match results.try_send(sealed) {
            Ok(()) => {
                info!(
                    "Work submitted is acceptable: number {} sealhash {}",
                    number,
                    hexutil::encode(solution.seal_hash)
                );
                // one delivery per height: superseded siblings go too
                self.works.retain(|_, header| header.number != number);
                true
            }
            Err(_) => {
                warn!("Sealing result is not read by miner: mode remote");
                false
            }
        }
    }

    fn prune(&mut self) {
        if let Some(current) = &self.current {
            let number = current.number;
            self.works
                .retain(|_, header| header.number + STALE_THRESHOLD > number);
        }
        self.rates
            .retain(|_, entry| entry.refreshed.elapsed() <= HASHRATE_EXPIRY);
    }
}
