// src/utils/logging.rs
//! Logging configuration and utilities
//!
//! Sets up `env_logger` for the engine binary. Lines carry the emitting
//! thread, so output from `frkhash-miner-N`, `frkhash-remote` and
//! `frkhash-sealer` can be told apart:
//! `[<seconds> <LEVEL> <thread> <module>:<line>] <message>`.

use env_logger::{Builder, Target};
use log::LevelFilter;
use std::env;

/// Crates whose debug output drowns the engine's own
const QUIET_MODULES: [&str; 4] = ["hyper", "hyper_util", "reqwest", "mio"];

/// Initializes the logging subsystem
///
/// # Arguments
/// * `default_level` - Level used when `RUST_LOG` is not set
///
/// The HTTP stack is capped at `warn` unless `RUST_LOG` names it. Safe to
/// call more than once; later calls are ignored.
pub fn init_logging(default_level: LevelFilter) {
    let mut builder = engine_log_config();

    match env::var("RUST_LOG") {
        Ok(filters) => {
            builder.parse_filters(&filters);
        }
        Err(_) => {
            builder.filter_level(default_level);
            for module in QUIET_MODULES {
                builder.filter_module(module, LevelFilter::Warn);
            }
        }
    }

    let _ = builder.try_init();
}

/// Configures benchmark logging: debug by default, so epoch generation
/// progress is visible
pub fn init_bench_logging() {
    init_logging(LevelFilter::Debug);
}

fn engine_log_config() -> Builder {
    let mut builder = Builder::new();

    builder
        .format(|buf, record| {
            use std::io::Write;
            let ts = buf.timestamp_seconds();
            let thread = std::thread::current();

            writeln!(
                buf,
                "[{} {} {} {}:{}] {}",
                ts,
                record.level(),
                thread.name().unwrap_or("-"),
                record.module_path().unwrap_or_default(),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(Target::Stdout);

    builder
}
