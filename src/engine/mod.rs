// src/engine/mod.rs
//! The proof-of-work consensus engine
//!
//! [`Engine`] dispatches on [`PowMode`]:
//! - `Normal` and `Test` verify with the real puzzle, mine locally and run a
//!   remote sealer for external miners
//! - `Shared` forwards everything to the process-wide [`Engine::shared`]
//!   instance so several engines reuse one cache/dataset memo
//! - `Fake` and `FullFake` accept seals without hashing
//!
//! The engine is a cheap, clonable handle; clones share all state.

/// Verification core and mining context
pub mod pow;

use self::pow::{CoreOptions, PowCore};
use crate::config::Config;
use crate::miner::algorithm::new_algorithm;
use crate::miner::remote::{RemoteOptions, RemoteSealer};
use crate::miner::scheduler::Scheduler;
use crate::network::api::{Api, ApiDescriptor};
use crate::network::notify::Notifier;
use crate::stats::MeterSnapshot;
use crate::types::{BlockNonce, H256, Header, PowMode};
use crate::utils::error::FrkhashError;
use crossbeam_channel::{Receiver, Sender};
use lazy_static::lazy_static;
use log::{info, warn};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

lazy_static! {
    static ref SHARED: Engine = Engine::build(&Config::default(), None);
}

/// Lifecycle of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Accepting work
    Running,
    /// `close` is tearing the engine down
    Stopping,
    /// Torn down
    Stopped,
}

struct EngineInner {
    mode: PowMode,
    core: Arc<PowCore>,
    scheduler: Scheduler,
    remote: Option<RemoteSealer>,
    shared: Option<Engine>,
    lifecycle: Mutex<Lifecycle>,
    stopped: Condvar,
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        if let Some(remote) = &self.remote {
            remote.stop();
        }
    }
}

/// Proof-of-work consensus engine
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Creates an engine from configuration
    ///
    /// A `pow_mode` of `shared` yields the same result as [`Engine::new_shared`].
    pub fn new(config: &Config) -> Result<Engine, FrkhashError> {
        if config.pow_mode == PowMode::Shared {
            return Ok(Engine::new_shared());
        }
        let notifier = if config.notify.is_empty() || !config.pow_mode.is_real() {
            None
        } else {
            Some(Notifier::new(config.notify.clone(), config.notify_full)?)
        };
        Ok(Engine::build(config, notifier))
    }

    /// Creates a test-mode engine with tiny caches and datasets
    ///
    /// # Arguments
    /// * `notify` - Endpoints notified of new remote work
    /// * `noverify` - Accept remote solutions without checking them
    pub fn new_tester(notify: Vec<Url>, noverify: bool) -> Result<Engine, FrkhashError> {
        Engine::new(&Config {
            pow_mode: PowMode::Test,
            notify,
            noverify,
            caches_in_mem: 1,
            datasets_in_mem: 1,
            ..Config::default()
        })
    }

    /// Creates an engine that accepts every seal
    pub fn new_faker() -> Engine {
        Engine::build_fake(PowMode::Fake, CoreOptions::default())
    }

    /// Creates a fake engine rejecting the seal of block `fail`
    pub fn new_fake_failer(fail: u64) -> Engine {
        Engine::build_fake(
            PowMode::Fake,
            CoreOptions {
                fake_fail: Some(fail),
                ..CoreOptions::default()
            },
        )
    }

    /// Creates a fake engine that sleeps `delay` before each verification
    pub fn new_fake_delayer(delay: Duration) -> Engine {
        Engine::build_fake(
            PowMode::Fake,
            CoreOptions {
                fake_delay: Some(delay),
                ..CoreOptions::default()
            },
        )
    }

    /// Creates an engine that skips every check
    pub fn new_full_faker() -> Engine {
        Engine::build_fake(PowMode::FullFake, CoreOptions::default())
    }

    /// Creates an engine backed by the process-wide shared instance
    pub fn new_shared() -> Engine {
        let shared = Engine::shared();
        let inner = EngineInner {
            mode: PowMode::Shared,
            core: shared.inner.core.clone(),
            scheduler: shared.inner.scheduler.clone(),
            remote: None,
            shared: Some(shared),
            lifecycle: Mutex::new(Lifecycle::Running),
            stopped: Condvar::new(),
        };
        Engine {
            inner: Arc::new(inner),
        }
    }

    /// The process-wide normal-mode engine, created on first use
    pub fn shared() -> Engine {
        SHARED.clone()
    }

    fn build(config: &Config, notifier: Option<Notifier>) -> Engine {
        let mode = config.pow_mode;
        let core = Arc::new(PowCore::new(
            mode,
            new_algorithm(config.algorithm),
            CoreOptions {
                caches_in_mem: config.caches_in_mem,
                datasets_in_mem: config.datasets_in_mem,
                cache_dir: config.cache_dir.clone(),
                dataset_dir: config.dataset_dir.clone(),
                ..CoreOptions::default()
            },
        ));

        let remote = if mode.is_real() {
            let options = RemoteOptions {
                notifier,
                noverify: config.noverify,
            };
            match RemoteSealer::start(core.clone(), options) {
                Ok(remote) => Some(remote),
                Err(e) => {
                    warn!("Remote sealer unavailable: {}", e);
                    None
                }
            }
        } else {
            None
        };

        info!(
            "Created {} engine: algorithm {}, {} threads",
            mode, config.algorithm, config.threads
        );
        Engine {
            inner: Arc::new(EngineInner {
                mode,
                core: core.clone(),
                scheduler: Scheduler::new(core, config.threads, remote.clone()),
                remote,
                shared: None,
                lifecycle: Mutex::new(Lifecycle::Running),
                stopped: Condvar::new(),
            }),
        }
    }

    fn build_fake(mode: PowMode, options: CoreOptions) -> Engine {
        let algorithm = new_algorithm(Default::default());
        let core = Arc::new(PowCore::new(mode, algorithm, options));
        Engine {
            inner: Arc::new(EngineInner {
                mode,
                core: core.clone(),
                scheduler: Scheduler::new(core, 0, None),
                remote: None,
                shared: None,
                lifecycle: Mutex::new(Lifecycle::Running),
                stopped: Condvar::new(),
            }),
        }
    }

    /// Mode this engine was created in
    pub fn mode(&self) -> PowMode {
        self.inner.mode
    }

    /// Current lifecycle state
    pub fn lifecycle(&self) -> Lifecycle {
        *self.inner.lifecycle.lock()
    }

    /// Verification core (the shared one for shared engines)
    pub fn core(&self) -> &Arc<PowCore> {
        &self.inner.core
    }

    /// Remote sealer serving external miners, if this engine has one
    pub fn remote(&self) -> Option<&RemoteSealer> {
        match &self.inner.shared {
            Some(shared) => shared.inner.remote.as_ref(),
            None => self.inner.remote.as_ref(),
        }
    }

    /// Configured local mining threads
    pub fn threads(&self) -> i32 {
        match &self.inner.shared {
            Some(shared) => shared.threads(),
            None => self.inner.scheduler.threads(),
        }
    }

    /// Updates the local mining thread count
    ///
    /// Zero means one thread per core, negative values stop local mining. An
    /// in-flight `seal` restarts with the new count.
    pub fn set_threads(&self, threads: i32) {
        match &self.inner.shared {
            Some(shared) => shared.set_threads(threads),
            None => self.inner.scheduler.set_threads(threads),
        }
    }

    /// Local hashrate plus the rates reported by remote miners
    ///
    /// Falls back to the local rate alone once the remote sealer is gone.
    pub fn hashrate(&self) -> f64 {
        if let Some(shared) = &self.inner.shared {
            return shared.hashrate();
        }
        let local = self.inner.scheduler.meter().rate1();
        if !self.inner.mode.is_real() {
            return local;
        }
        match self.inner.remote.as_ref().map(|r| r.aggregate_hashrate()) {
            Some(Ok(remote)) => local + remote as f64,
            _ => local,
        }
    }

    /// Count and rates of the local hashrate meter
    pub fn local_hashrate(&self) -> MeterSnapshot {
        match &self.inner.shared {
            Some(shared) => shared.local_hashrate(),
            None => self.inner.scheduler.meter().snapshot(),
        }
    }

    /// Hash of the header the puzzle is computed over
    pub fn seal_hash(&self, header: &Header) -> H256 {
        header.seal_hash()
    }

    /// Checks the nonce and mix digest of `header`
    pub fn verify_seal(&self, header: &Header) -> Result<(), FrkhashError> {
        match &self.inner.shared {
            Some(shared) => shared.verify_seal(header),
            None => self.inner.core.verify_seal(header, false),
        }
    }

    /// Starts sealing `header`; the sealed header is offered to `results`
    ///
    /// Returns once work is handed out. Fake modes answer immediately with a
    /// zero nonce and digest. `stop` aborts local workers when it yields or
    /// disconnects.
    pub fn seal(
        &self,
        header: Header,
        results: Sender<Header>,
        stop: Receiver<()>,
    ) -> Result<(), FrkhashError> {
        if self.lifecycle() != Lifecycle::Running {
            return Err(FrkhashError::EngineStopped);
        }
        match self.inner.mode {
            PowMode::Fake | PowMode::FullFake => {
                let sealed = header.with_seal(BlockNonce::default(), [0u8; 32]);
                if results.try_send(sealed).is_err() {
                    warn!(
                        "Sealing result is not read by miner: mode {} number {}",
                        self.inner.mode, header.number
                    );
                }
                Ok(())
            }
            PowMode::Shared => match &self.inner.shared {
                Some(shared) => shared.seal(header, results, stop),
                None => Err(FrkhashError::EngineStopped),
            },
            PowMode::Normal | PowMode::Test => self.inner.scheduler.seal(header, results, stop),
        }
    }

    /// RPC services, exposed under both the `eth` and `frkhash` namespaces
    pub fn apis(&self) -> Vec<ApiDescriptor> {
        ["eth", "frkhash"]
            .into_iter()
            .map(|namespace| ApiDescriptor {
                namespace,
                version: "1.0",
                service: Api::new(self.clone()),
                public: true,
            })
            .collect()
    }

    /// Shuts the engine down, stopping its remote sealer
    ///
    /// Idempotent and safe to call concurrently: the first caller performs
    /// the teardown, the others wait until it has finished.
    pub fn close(&self) -> Result<(), FrkhashError> {
        let mut state = self.inner.lifecycle.lock();
        match *state {
            Lifecycle::Stopped => return Ok(()),
            Lifecycle::Stopping => {
                while *state != Lifecycle::Stopped {
                    self.inner.stopped.wait(&mut state);
                }
                return Ok(());
            }
            Lifecycle::Running => *state = Lifecycle::Stopping,
        }
        drop(state);

        if let Some(remote) = &self.inner.remote {
            remote.stop();
        }
        info!("Closed {} engine", self.inner.mode);

        *self.inner.lifecycle.lock() = Lifecycle::Stopped;
        self.inner.stopped.notify_all();
        Ok(())
    }
}
