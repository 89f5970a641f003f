// src/network/mod.rs
//! Network-facing components
//!
//! - `Api`: the remote mining RPC façade (getWork/submitWork/submitHashrate)
//! - `Notifier`: fire-and-forget HTTP notifications of new work

/// Remote mining RPC façade
///
/// Translates JSON-RPC calls into remote sealer requests and exposes the
/// service descriptors registered under the `eth` and `frkhash` namespaces.
pub mod api;

/// HTTP work notifications
pub mod notify;

// Re-export main components for cleaner imports
pub use api::{Api, ApiDescriptor};
pub use notify::Notifier;
