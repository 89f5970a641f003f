// src/network/api.rs
//! RPC façade for remote miners
//!
//! Exposes `getWork`, `submitWork`, `submitHashrate` and `getHashrate`
//! over the engine's remote sealer. [`Api::handle`] maps JSON-RPC method
//! names and hex-encoded parameters onto those calls; the transport carrying
//! the requests lives elsewhere.

use crate::engine::{Engine, Lifecycle};
use crate::miner::remote::{RemoteSealer, Solution};
use crate::types::{BlockNonce, H256};
use crate::utils::error::FrkhashError;
use crate::utils::hexutil;
use serde_json::{Value, json};

/// JSON-RPC error code for failed calls
const RPC_ERROR: i64 = -32000;
/// JSON-RPC error code for unknown methods
const RPC_METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC error code for malformed parameters
const RPC_INVALID_PARAMS: i64 = -32602;

/// One service registration
pub struct ApiDescriptor {
    /// Method prefix, e.g. `eth` for `eth_getWork`
    pub namespace: &'static str,
    /// Service version
    pub version: &'static str,
    /// The service itself
    pub service: Api,
    /// Whether the service is reachable without authentication
    pub public: bool,
}

/// Remote mining API of an engine
#[derive(Clone)]
pub struct Api {
    engine: Engine,
}

impl Api {
    /// Wraps an engine
    pub fn new(engine: Engine) -> Self {
        Api { engine }
    }

    /// Remote sealer behind this handle, unless the handle was closed
    ///
    /// Shared handles borrow the process-wide sealer, which outlives them, so
    /// the handle's own lifecycle decides.
    fn sealer(&self) -> Result<&RemoteSealer, FrkhashError> {
        if self.engine.lifecycle() != Lifecycle::Running {
            return Err(FrkhashError::EngineStopped);
        }
        self.engine
            .remote()
            .ok_or_else(|| FrkhashError::NotSupported("remote mining".into()))
    }

    /// Returns `[sealHash, seedHash, target, number]` of the current work
    ///
    /// # Returns
    /// * `Err(FrkhashError::NotSupported)` - the engine has no remote sealer
    /// * `Err(FrkhashError::NoMiningWork)` - no work was issued yet
    /// * `Err(FrkhashError::EngineStopped)` - the engine was closed
    pub fn get_work(&self) -> Result<[String; 4], FrkhashError> {
        Ok(self.sealer()?.current_work()?.to_strings())
    }

    /// Submits a solution found by a remote miner
    ///
    /// `false` covers every rejection: unknown or stale work, a bad seal,
    /// a duplicate, a closed engine or one without remote sealer.
    pub fn submit_work(&self, nonce: BlockNonce, seal_hash: H256, mix_digest: H256) -> bool {
        match self.sealer() {
            Ok(remote) => remote.submit_work(Solution {
                nonce,
                seal_hash,
                mix_digest,
            }),
            Err(_) => false,
        }
    }

    /// Records a remote miner's hashrate
    pub fn submit_hashrate(&self, rate: u64, id: H256) -> bool {
        match self.sealer() {
            Ok(remote) => remote.submit_hashrate(id, rate),
            Err(_) => false,
        }
    }

    /// Total hashrate, local and remote, in hashes per second
    pub fn get_hashrate(&self) -> u64 {
        self.engine.hashrate() as u64
    }

    /// Dispatches a JSON-RPC method call
    ///
    /// Accepts `getWork`, `submitWork`, `submitHashrate` and `getHashrate`
    /// under the `eth_` and `frkhash_` prefixes, plus `eth_hashrate`.
    pub fn handle(&self, method: &str, params: &Value) -> Result<Value, FrkhashError> {
        let name = method
            .strip_prefix("eth_")
            .or_else(|| method.strip_prefix("frkhash_"))
            .ok_or_else(|| FrkhashError::NotSupported(method.to_string()))?;

        match name {
            "getWork" => Ok(json!(self.get_work()?)),
            "submitWork" => {
                let nonce = BlockNonce(hexutil::decode_fixed(param(params, 0)?)?);
                let seal_hash = hexutil::decode_fixed(param(params, 1)?)?;
                let mix_digest = hexutil::decode_fixed(param(params, 2)?)?;
                Ok(json!(self.submit_work(nonce, seal_hash, mix_digest)))
            }
            "submitHashrate" => {
                let rate = hexutil::decode_u64(param(params, 0)?)?;
                let id = hexutil::decode_fixed(param(params, 1)?)?;
                Ok(json!(self.submit_hashrate(rate, id)))
            }
            "getHashrate" | "hashrate" => Ok(json!(hexutil::encode_u64(self.get_hashrate()))),
            _ => Err(FrkhashError::NotSupported(method.to_string())),
        }
    }

    /// Answers a complete JSON-RPC 2.0 request object
    pub fn handle_request(&self, request: &Value) -> Value {
        let id = request.get("id").cloned().unwrap_or(Value::Null);
        let method = request.get("method").and_then(Value::as_str).unwrap_or_default();
        let params = request.get("params").cloned().unwrap_or_else(|| json!([]));

        match self.handle(method, &params) {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
            Err(e) => {
                let code = match e {
                    FrkhashError::NotSupported(_) => RPC_METHOD_NOT_FOUND,
                    FrkhashError::InputError(_) => RPC_INVALID_PARAMS,
                    _ => RPC_ERROR,
                };
                json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": { "code": code, "message": e.to_string() }
                })
            }
        }
    }
}

fn param(params: &Value, index: usize) -> Result<&str, FrkhashError> {
    params
        .get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| FrkhashError::InputError(format!("missing string parameter {}", index)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_engines_do_not_support_remote_work() {
        let api = Api::new(Engine::new_faker());
        assert!(matches!(api.get_work(), Err(FrkhashError::NotSupported(_))));
        assert!(!api.submit_work(BlockNonce::default(), [0; 32], [0; 32]));
        assert!(!api.submit_hashrate(10, [1; 32]));
    }

    #[test]
    fn closed_engines_report_stopped_before_unsupported() {
        let engine = Engine::new_faker();
        let api = Api::new(engine.clone());
        engine.close().unwrap();
        assert_eq!(api.get_work().unwrap_err(), FrkhashError::EngineStopped);
    }

    #[test]
    fn dispatch_rejects_unknown_methods() {
        let api = Api::new(Engine::new_full_faker());
        let response = api.handle_request(&json!({
            "jsonrpc": "2.0", "id": 3, "method": "eth_mine", "params": []
        }));
        assert_eq!(response["id"], 3);
        assert_eq!(response["error"]["code"], RPC_METHOD_NOT_FOUND);

        let response = api.handle_request(&json!({
            "jsonrpc": "2.0", "id": 4, "method": "frkhash_submitWork", "params": ["0x01"]
        }));
        assert_eq!(response["error"]["code"], RPC_INVALID_PARAMS);
    }

    #[test]
    fn dispatch_reports_hashrate_as_quantity() {
        let api = Api::new(Engine::new_faker());
        assert_eq!(api.handle("eth_hashrate", &json!([])).unwrap(), json!("0x0"));
        assert_eq!(api.handle("frkhash_getHashrate", &json!([])).unwrap(), json!("0x0"));
    }
}
