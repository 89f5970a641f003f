// src/cli/commands.rs
use crate::types::{AlgorithmType, PowMode};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// frkhash CLI - Ethash-family proof-of-work engine in Rust
#[derive(Parser, Debug)]
#[command(name = "frkhash-rs")]
#[command(version, about, long_about = None)]
pub struct Commands {
    /// The action to perform
    #[command(subcommand)]
    pub action: Action,
}

/// Top-level commands of the engine binary
#[derive(Subcommand, Debug)]
pub enum Action {
    /// Compute the digest and result for one hash/nonce pair
    Hash(HashOptions),

    /// Verify the seal of a header read from a JSON file
    Verify(VerifyOptions),

    /// Seal a synthetic header with local workers and print it
    Seal(SealOptions),

    /// Measure the local hashrate
    Benchmark(BenchmarkOptions),

    /// Generate configuration file template
    Config(ConfigOptions),
}

/// Engine selection shared by the commands that build one
#[derive(Args, Debug, Clone)]
pub struct EngineOptions {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Engine mode (overrides config)
    #[arg(short, long)]
    pub mode: Option<PowMode>,

    /// Proof-of-work strategy (overrides config)
    #[arg(short, long)]
    pub algorithm: Option<AlgorithmType>,
}

/// Options for hashing a single nonce
#[derive(Parser, Debug)]
pub struct HashOptions {
    /// Engine selection
    #[command(flatten)]
    pub engine: EngineOptions,

    /// Block number selecting the epoch
    #[arg(short, long, default_value_t = 0)]
    pub number: u64,

    /// 32-byte sealing hash, hex encoded
    #[arg(long)]
    pub hash: String,

    /// Nonce to evaluate
    #[arg(long, default_value_t = 0)]
    pub nonce: u64,

    /// Generate the full dataset and hash against it
    #[arg(long)]
    pub fulldag: bool,
}

/// Options for verifying a sealed header
#[derive(Parser, Debug)]
pub struct VerifyOptions {
    /// Engine selection
    #[command(flatten)]
    pub engine: EngineOptions,

    /// JSON file containing the header
    pub header: PathBuf,
}

/// Options for sealing a synthetic header
#[derive(Parser, Debug)]
pub struct SealOptions {
    /// Engine selection
    #[command(flatten)]
    pub engine: EngineOptions,

    /// Block number of the header
    #[arg(short, long, default_value_t = 1)]
    pub number: u64,

    /// Difficulty of the header (decimal)
    #[arg(short, long, default_value = "1000")]
    pub difficulty: String,

    /// Number of threads to use (overrides config)
    #[arg(short, long)]
    pub threads: Option<i32>,

    /// Seconds to wait for a seal
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,
}

/// Options for running a hashrate benchmark
#[derive(Parser, Debug)]
pub struct BenchmarkOptions {
    /// Engine selection
    #[command(flatten)]
    pub engine: EngineOptions,

    /// Block number selecting the epoch
    #[arg(short, long, default_value_t = 0)]
    pub number: u64,

    /// Duration of benchmark in seconds
    #[arg(short, long, default_value_t = 60)]
    pub duration: u64,

    /// Number of threads to use (0 = all cores)
    #[arg(short, long, default_value_t = 0)]
    pub threads: i32,
}

/// Options for generating configuration files
#[derive(Parser, Debug)]
pub struct ConfigOptions {
    /// Output file path
    #[arg(short, long, default_value = "frkhash.toml")]
    pub output: PathBuf,

    /// Include work notification settings
    #[arg(short, long)]
    pub notify: bool,
}
