// src/main.rs
use clap::Parser;
use crossbeam_channel::bounded;
use frkhash_rs::cli::{self, Action, EngineOptions};
use frkhash_rs::epoch;
use frkhash_rs::utils::hexutil;
use frkhash_rs::utils::logging::init_bench_logging;
use frkhash_rs::{Config, Engine, FrkhashError, Header, U256, config, init_logging};
use log::{LevelFilter, info};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Main entry point for the frkhash engine binary
///
/// # Returns
/// - `Ok(())` on successful execution
/// - `Err(FrkhashError)` if any operation fails
///
/// # Flow
/// 1. Parses command line arguments
/// 2. Delegates to appropriate subcommand handler
/// 3. Propagates any errors upward
fn main() -> Result<(), FrkhashError> {
    let cli = cli::Commands::parse();

    match cli.action {
        Action::Hash(opts) => run_hash(opts),
        Action::Verify(opts) => run_verify(opts),
        Action::Seal(opts) => run_seal(opts),
        Action::Benchmark(opts) => run_benchmark(opts),
        Action::Config(opts) => generate_config(opts),
    }
}

/// Loads the configuration and applies command line overrides
fn load_config(opts: &EngineOptions) -> Result<Config, FrkhashError> {
    let mut config = match &opts.config {
        Some(path) => config::load(path.clone())?,
        None => Config::default(),
    };
    if let Some(mode) = opts.mode {
        config.pow_mode = mode;
    }
    if let Some(algorithm) = opts.algorithm {
        config.algorithm = algorithm;
    }
    Ok(config)
}

/// Prints the digest and result of one hash/nonce pair
fn run_hash(opts: cli::HashOptions) -> Result<(), FrkhashError> {
    init_logging(LevelFilter::Info);

    let engine = Engine::new(&load_config(&opts.engine)?)?;
    let hash: [u8; 32] = hexutil::decode_fixed(&opts.hash)?;
    let core = engine.core();
    if opts.fulldag && core.algorithm().needs_lookup() {
        epoch::checked_epoch(opts.number)?;
        core.dataset(opts.number);
    }

    let (digest, result) = core.compute(opts.number, &hash, opts.nonce, opts.fulldag)?;
    println!("digest: {}", hexutil::encode(digest));
    println!("result: {}", hexutil::encode(result));
    engine.close()
}

/// Verifies the seal of a header stored as JSON
///
/// # Operations
/// 1. Reads and decodes the header file
/// 2. Builds the engine from configuration
/// 3. Reports whether the seal is valid
fn run_verify(opts: cli::VerifyOptions) -> Result<(), FrkhashError> {
    init_logging(LevelFilter::Info);

    let header: Header = serde_json::from_str(&std::fs::read_to_string(&opts.header)?)?;
    let engine = Engine::new(&load_config(&opts.engine)?)?;
    let outcome = engine.verify_seal(&header);
    match &outcome {
        Ok(()) => println!(
            "block {} seal valid (sealhash {})",
            header.number,
            hexutil::encode(engine.seal_hash(&header))
        ),
        Err(e) => println!("block {} seal invalid: {}", header.number, e),
    }
    engine.close()?;
    outcome
}

/// Seals a synthetic header and prints it as JSON
fn run_seal(opts: cli::SealOptions) -> Result<(), FrkhashError> {
    init_logging(LevelFilter::Info);

    let mut config = load_config(&opts.engine)?;
    if let Some(threads) = opts.threads {
        config.threads = threads;
    }
    let difficulty = U256::from_dec_str(&opts.difficulty)
        .map_err(|e| FrkhashError::InputError(format!("bad difficulty {}: {:?}", opts.difficulty, e)))?;
    let time = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let header = Header {
        number: opts.number,
        difficulty,
        time,
        ..Default::default()
    };

    let engine = Engine::new(&config)?;
    let (results_tx, results) = bounded(1);
    let (stop_tx, stop) = bounded::<()>(0);
    engine.seal(header, results_tx, stop)?;

    let sealed = results
        .recv_timeout(Duration::from_secs(opts.timeout))
        .map_err(|_| {
            FrkhashError::ChannelError(format!("no seal found within {}s", opts.timeout))
        })?;
    drop(stop_tx);
    engine.verify_seal(&sealed)?;

    println!("{}", serde_json::to_string_pretty(&sealed)?);
    engine.close()
}

/// Runs a local hashrate benchmark
///
/// # Operations
/// 1. Initializes benchmark-specific logging
/// 2. Prepares the dataset of the selected epoch
/// 3. Seals an unreachable target for the requested duration
/// 4. Reports the meter readings
fn run_benchmark(opts: cli::BenchmarkOptions) -> Result<(), FrkhashError> {
    init_bench_logging();

    let mut config = load_config(&opts.engine)?;
    config.threads = opts.threads;
    let engine = Engine::new(&config)?;
    if engine.core().algorithm().needs_lookup() && engine.mode().is_real() {
        epoch::checked_epoch(opts.number)?;
        engine.core().dataset(opts.number);
    }

    info!(
        "Starting {} benchmark for {} seconds",
        config.algorithm, opts.duration
    );
    let header = Header {
        number: opts.number,
        difficulty: U256::MAX,
        ..Default::default()
    };
    let (results_tx, _results) = bounded(1);
    let (stop_tx, stop) = bounded::<()>(0);
    engine.seal(header, results_tx, stop)?;

    std::thread::sleep(Duration::from_secs(opts.duration));
    drop(stop_tx);
    // workers mark their last partial batch on exit
    std::thread::sleep(Duration::from_millis(250));

    let snapshot = engine.local_hashrate();
    info!(
        "Benchmark finished: {} hashes, {:.2} H/s mean, {:.2} H/s one-minute rate",
        snapshot.count, snapshot.rate_mean, snapshot.rate1
    );
    log::logger().flush(); // Ensure final results appear
    engine.close()
}

/// Generates configuration template file
///
/// # Arguments
/// * `opts` - Configuration generation options
fn generate_config(opts: cli::ConfigOptions) -> Result<(), FrkhashError> {
    let config = config::generate_template(opts.notify);
    std::fs::write(opts.output, config)?;
    Ok(())
}
