// src/utils/hexutil.rs
//! `0x`-prefixed hex helpers
//!
//! Byte strings are encoded as full-width hex (`0x00ab`), quantities as
//! minimal hex without leading zeros (`0x1`, `0x0`). Decoding accepts the
//! prefix as optional so values pasted from block explorers still parse.

use crate::types::U256;
use crate::utils::error::FrkhashError;

/// Encodes bytes as `0x`-prefixed lowercase hex
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decodes an optionally `0x`-prefixed hex string
pub fn decode(s: &str) -> Result<Vec<u8>, FrkhashError> {
    Ok(hex::decode(strip_prefix(s))?)
}

/// Decodes hex into a fixed-size array, rejecting any other length
pub fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], FrkhashError> {
    let bytes = decode(s)?;
    bytes.as_slice().try_into().map_err(|_| {
        FrkhashError::InputError(format!("expected {} bytes, got {}", N, bytes.len()))
    })
}

/// Encodes a `u64` as a hex quantity
pub fn encode_u64(n: u64) -> String {
    format!("0x{:x}", n)
}

/// Decodes a hex quantity into a `u64`
pub fn decode_u64(s: &str) -> Result<u64, FrkhashError> {
    let digits = strip_prefix(s);
    if digits.is_empty() {
        return Err(FrkhashError::InputError("empty hex quantity".into()));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| FrkhashError::InputError(format!("bad quantity {}: {}", s, e)))
}

/// Encodes a 256-bit integer as a hex quantity
pub fn encode_u256(v: &U256) -> String {
    let bytes = u256_be_bytes(v);
    match bytes.iter().position(|b| *b != 0) {
        None => "0x0".to_string(),
        Some(first) => {
            let digits = hex::encode(&bytes[first..]);
            format!("0x{}", digits.trim_start_matches('0'))
        }
    }
}

/// Decodes a hex quantity (at most 64 digits) into a 256-bit integer
pub fn decode_u256(s: &str) -> Result<U256, FrkhashError> {
    let digits = strip_prefix(s);
    if digits.is_empty() || digits.len() > 64 {
        return Err(FrkhashError::InputError(format!("bad 256-bit quantity: {}", s)));
    }
    let padded = if digits.len() % 2 == 1 {
        format!("0{}", digits)
    } else {
        digits.to_string()
    };
    Ok(U256::from_big_endian(&hex::decode(padded)?))
}

/// Big-endian 32-byte representation of a 256-bit integer
pub fn u256_be_bytes(v: &U256) -> [u8; 32] {
    v.to_big_endian()
}

fn strip_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Serde adapter for fixed-size byte arrays
pub mod fixed {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    /// Writes the array as a `0x` hex string
    pub fn serialize<S: Serializer, const N: usize>(v: &[u8; N], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::encode(v))
    }

    /// Reads a `0x` hex string of exactly `N` bytes
    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(d: D) -> Result<[u8; N], D::Error> {
        let s = String::deserialize(d)?;
        super::decode_fixed(&s).map_err(D::Error::custom)
    }
}

/// Serde adapter for variable-length byte strings
pub mod bytes {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    /// Writes the bytes as a `0x` hex string
    pub fn serialize<S: Serializer>(v: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::encode(v))
    }

    /// Reads a `0x` hex string of any length
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        super::decode(&s).map_err(D::Error::custom)
    }
}

/// Serde adapter for `u64` quantities
pub mod quantity {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    /// Writes the value as a hex quantity without leading zeros
    pub fn serialize<S: Serializer>(v: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::encode_u64(*v))
    }

    /// Reads a hex quantity into a `u64`
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        let s = String::deserialize(d)?;
        super::decode_u64(&s).map_err(D::Error::custom)
    }
}

/// Serde adapter for 256-bit quantities
pub mod big {
    use crate::types::U256;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    /// Writes the value as a hex quantity without leading zeros
    pub fn serialize<S: Serializer>(v: &U256, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::encode_u256(v))
    }

    /// Reads a hex quantity of at most 256 bits
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<U256, D::Error> {
        let s = String::deserialize(d)?;
        super::decode_u256(&s).map_err(D::Error::custom)
    }
}
