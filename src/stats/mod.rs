//! Statistics collection
//!
//! Local hashrate tracking for the sealing engine. Worker threads mark the
//! number of nonces they tried; readers get a one-minute moving average.

/// Submodule containing the hashrate meter
///
/// The meter handles:
/// - Atomic-free counting behind a short lock
/// - Lazy exponentially-weighted rate updates on 5 second ticks
pub mod meter;

// Re-export main components
pub use meter::{Meter, MeterSnapshot};
