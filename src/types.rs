// src/types.rs
use crate::utils::hexutil;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

#[allow(missing_docs)]
mod wide {
    use uint::construct_uint;

    construct_uint! {
        /// 256-bit unsigned integer used for difficulties and targets
        pub struct U256(4);
    }
}

pub use wide::U256;

/// 32-byte hash
pub type H256 = [u8; 32];

/// 20-byte account address
pub type Address = [u8; 20];

/// 64-bit proof-of-work nonce, stored big-endian as in the block header
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlockNonce(pub [u8; 8]);

impl BlockNonce {
    /// Encodes a nonce value
    pub fn from_u64(n: u64) -> Self {
        BlockNonce(n.to_be_bytes())
    }

    /// The numeric nonce value
    pub fn as_u64(&self) -> u64 {
        u64::from_be_bytes(self.0)
    }
}

impl Serialize for BlockNonce {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        hexutil::fixed::serialize(&self.0, s)
    }
}

impl<'de> Deserialize<'de> for BlockNonce {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        hexutil::fixed::deserialize(d).map(BlockNonce)
    }
}

/// Block header fields the proof-of-work engine consumes
///
/// Only `number`, `difficulty`, `mix_digest` and `nonce` take part in
/// verification; the remaining fields feed the sealing hash.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    /// Hash of the parent block
    #[serde(with = "hexutil::fixed")]
    pub parent_hash: H256,
    /// Beneficiary of the block reward
    #[serde(rename = "miner", with = "hexutil::fixed")]
    pub coinbase: Address,
    /// State trie root
    #[serde(with = "hexutil::fixed")]
    pub state_root: H256,
    /// Transaction trie root
    #[serde(rename = "transactionsRoot", with = "hexutil::fixed")]
    pub tx_root: H256,
    /// Block height
    #[serde(with = "hexutil::quantity")]
    pub number: u64,
    /// Proof-of-work difficulty
    #[serde(with = "hexutil::big")]
    pub difficulty: U256,
    /// Gas limit
    #[serde(with = "hexutil::quantity")]
    pub gas_limit: u64,
    /// Gas used
    #[serde(with = "hexutil::quantity")]
    pub gas_used: u64,
    /// Timestamp (seconds)
    #[serde(rename = "timestamp", with = "hexutil::quantity")]
    pub time: u64,
    /// Extra data
    #[serde(rename = "extraData", with = "hexutil::bytes")]
    pub extra: Vec<u8>,
    /// Mix digest produced by the sealing search
    #[serde(rename = "mixHash", with = "hexutil::fixed")]
    pub mix_digest: H256,
    /// Winning nonce
    pub nonce: BlockNonce,
}

impl Header {
    /// Hash of the header without `nonce` and `mix_digest`
    ///
    /// This is the input to the proof-of-work puzzle and the key under which
    /// remote work packages are tracked.
    pub fn seal_hash(&self) -> H256 {
        let mut hasher = Keccak256::new();
        self.write_unsealed(&mut hasher);
        finish(hasher)
    }

    /// Hash of the complete header, seal fields included
    pub fn hash(&self) -> H256 {
        let mut hasher = Keccak256::new();
        self.write_unsealed(&mut hasher);
        hasher.update(self.mix_digest);
        hasher.update(self.nonce.0);
        finish(hasher)
    }

    /// Copy of the header carrying the given seal
    pub fn with_seal(&self, nonce: BlockNonce, mix_digest: H256) -> Header {
        Header {
            nonce,
            mix_digest,
            ..self.clone()
        }
    }

    fn write_unsealed(&self, hasher: &mut Keccak256) {
        hasher.update(self.parent_hash);
        hasher.update(self.coinbase);
        hasher.update(self.state_root);
        hasher.update(self.tx_root);
        hasher.update(self.number.to_be_bytes());
        hasher.update(hexutil::u256_be_bytes(&self.difficulty));
        hasher.update(self.gas_limit.to_be_bytes());
        hasher.update(self.gas_used.to_be_bytes());
        hasher.update(self.time.to_be_bytes());
        hasher.update((self.extra.len() as u64).to_be_bytes());
        hasher.update(&self.extra);
    }
}

fn finish(hasher: Keccak256) -> H256 {
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Engine operating modes
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowMode {
    /// Full proof-of-work with production-sized caches and datasets
    #[default]
    #[value(name = "normal")]
    Normal,

    /// Delegates caches, datasets and threads to the process-wide engine
    #[value(name = "shared")]
    Shared,

    /// Real proof-of-work over tiny caches and datasets
    #[value(name = "test")]
    Test,

    /// Accepts every seal, optionally failing or delaying on demand
    #[value(name = "fake")]
    Fake,

    /// Accepts every seal without any checks
    #[value(name = "fullfake")]
    FullFake,
}

impl PowMode {
    /// Whether seals are checked by actually running the hash
    pub fn is_real(&self) -> bool {
        matches!(self, PowMode::Normal | PowMode::Shared | PowMode::Test)
    }
}

impl fmt::Display for PowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowMode::Normal => write!(f, "normal"),
            PowMode::Shared => write!(f, "shared"),
            PowMode::Test => write!(f, "test"),
            PowMode::Fake => write!(f, "fake"),
            PowMode::FullFake => write!(f, "fullfake"),
        }
    }
}

impl FromStr for PowMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(PowMode::Normal),
            "shared" => Ok(PowMode::Shared),
            "test" => Ok(PowMode::Test),
            "fake" => Ok(PowMode::Fake),
            "fullfake" | "full-fake" => Ok(PowMode::FullFake),
            _ => Err(format!("Unknown pow mode: {}", s)),
        }
    }
}

/// Supported proof-of-work strategies
///
/// Both share the epoch, nonce and target conventions; they differ in how a
/// (hash, nonce) pair is turned into a digest and a result.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmType {
    /// Memory-hard hashimoto over an epoch cache/dataset
    ///
    /// Light verification needs the ~16 MiB cache, mining the >1 GiB dataset.
    #[default]
    #[value(name = "ethash")]
    Ethash,

    /// Two-hash keccak variant without any lookup structure
    #[value(name = "frankomoto")]
    Frankomoto,
}

impl fmt::Display for AlgorithmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlgorithmType::Ethash => write!(f, "ethash"),
            AlgorithmType::Frankomoto => write!(f, "frankomoto"),
        }
    }
}

impl FromStr for AlgorithmType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ethash" | "hashimoto" => Ok(AlgorithmType::Ethash),
            "frankomoto" | "frkhash" => Ok(AlgorithmType::Frankomoto),
            _ => Err(format!("Unknown algorithm: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Header {
        Header {
            number: 1,
            difficulty: U256::from(100u64),
            extra: b"frkhash".to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn seal_hash_ignores_seal_fields() {
        let header = sample_header();
        let sealed = header.with_seal(BlockNonce::from_u64(42), [7u8; 32]);
        assert_eq!(header.seal_hash(), sealed.seal_hash());
        assert_ne!(header.hash(), sealed.hash());
    }

    #[test]
    fn seal_hash_covers_difficulty() {
        let a = sample_header();
        let b = Header {
            difficulty: U256::from(1000u64),
            ..sample_header()
        };
        assert_ne!(a.seal_hash(), b.seal_hash());
    }

    #[test]
    fn nonce_is_big_endian() {
        let nonce = BlockNonce::from_u64(0x0102);
        assert_eq!(nonce.0, [0, 0, 0, 0, 0, 0, 1, 2]);
        assert_eq!(nonce.as_u64(), 0x0102);
    }

    #[test]
    fn header_json_uses_hex_fields() {
        let header = sample_header();
        let json = serde_json::to_value(&header).unwrap();
        assert_eq!(json["number"], "0x1");
        assert_eq!(json["difficulty"], "0x64");
        assert_eq!(json["nonce"], "0x0000000000000000");
        let back: Header = serde_json::from_value(json).unwrap();
        assert_eq!(back, header);
    }

    #[test]
    fn modes_parse_from_strings() {
        assert_eq!("FullFake".parse::<PowMode>().unwrap(), PowMode::FullFake);
        assert_eq!("frkhash".parse::<AlgorithmType>().unwrap(), AlgorithmType::Frankomoto);
        assert!("scrypt".parse::<AlgorithmType>().is_err());
        assert!(PowMode::Test.is_real());
        assert!(!PowMode::Fake.is_real());
    }
}
