// src/utils/error.rs
use std::io;
use thiserror::Error;

/// Main error type for the proof-of-work engine
///
/// Covers verification failures, coordinator lifecycle errors, dump
/// persistence problems and the plumbing errors (I/O, JSON, HTTP) that the
/// surrounding tooling can run into.
#[derive(Error, Debug)]
pub enum FrkhashError {
    /// No work package has been pushed to the remote sealer yet
    #[error("no mining work available yet")]
    NoMiningWork,

    /// The engine or its remote sealer has been shut down
    #[error("frkhash stopped")]
    EngineStopped,

    /// Mix digest mismatch or result above the difficulty target
    #[error("invalid proof-of-work")]
    InvalidProofOfWork,

    /// Header difficulty is zero
    #[error("non-positive difficulty")]
    InvalidDifficulty,

    /// Block height lies beyond the last epoch the engine can size
    #[error("block {0} is beyond the supported epoch range")]
    EpochOutOfRange(u64),

    /// A cache or dataset dump does not start with the expected marker
    #[error("invalid dump magic")]
    InvalidDumpMagic,

    /// Operation unavailable in the current engine mode
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Standard I/O operation errors
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    /// HTTP request/response errors
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Configuration file or parameter errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Thread communication channel errors
    #[error("Thread communication error: {0}")]
    ChannelError(String),

    /// Invalid user input or parameter errors
    #[error("Invalid input: {0}")]
    InputError(String),
}

/// Converts hex decoding errors into FrkhashError
///
/// Raised while parsing hashes, nonces and quantities coming from RPC
/// parameters or the command line.
impl From<hex::FromHexError> for FrkhashError {
    fn from(e: hex::FromHexError) -> Self {
        FrkhashError::InputError(format!("Hex conversion failed: {}", e))
    }
}

impl<T> From<crossbeam_channel::SendError<T>> for FrkhashError {
    fn from(e: crossbeam_channel::SendError<T>) -> Self {
        FrkhashError::ChannelError(format!("send failed: {}", e))
    }
}

/// A failed receive means the other side of the channel is gone, which for
/// every channel in this crate means the owning loop has exited.
impl From<crossbeam_channel::RecvError> for FrkhashError {
    fn from(_: crossbeam_channel::RecvError) -> Self {
        FrkhashError::EngineStopped
    }
}

impl PartialEq for FrkhashError {
    fn eq(&self, other: &Self) -> bool {
        use FrkhashError::*;
        match (self, other) {
            (NoMiningWork, NoMiningWork)
            | (EngineStopped, EngineStopped)
            | (InvalidProofOfWork, InvalidProofOfWork)
            | (InvalidDifficulty, InvalidDifficulty)
            | (InvalidDumpMagic, InvalidDumpMagic) => true,
            (EpochOutOfRange(a), EpochOutOfRange(b)) => a == b,
            (NotSupported(a), NotSupported(b))
            | (ConfigError(a), ConfigError(b))
            | (ChannelError(a), ChannelError(b))
            | (InputError(a), InputError(b)) => a == b,
            _ => false,
        }
    }
}
