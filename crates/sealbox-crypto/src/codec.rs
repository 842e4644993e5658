//! Binary ↔ text codec for envelope fields
//!
//! Standard base64 alphabet with padding. Decoding is strict: a bad character,
//! missing or extra padding, or non-canonical trailing bits is an error, never a
//! silently shortened byte string.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{CryptoError, CryptoResult};

/// Encode bytes as standard, padded base64.
pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode standard, padded base64.
pub fn decode(encoded: &str) -> CryptoResult<Vec<u8>> {
    STANDARD
        .decode(encoded)
        .map_err(|e| CryptoError::invalid(format!("base64 decode: {e}")))
}

/// Decode a fixed-width field such as a salt or nonce.
pub fn decode_array<const N: usize>(field: &str, encoded: &str) -> CryptoResult<[u8; N]> {
    let bytes = decode(encoded)?;
    to_array(field, &bytes)
}

pub(crate) fn to_array<const N: usize>(field: &str, bytes: &[u8]) -> CryptoResult<[u8; N]> {
    <[u8; N]>::try_from(bytes).map_err(|_| {
        CryptoError::invalid(format!("{field} must be {N} bytes, got {}", bytes.len()))
    })
}

/// `#[serde(with = "codec::base64_bytes")]` for variable-length byte fields.
pub mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<T, S>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: AsRef<[u8]> + ?Sized,
        S: Serializer,
    {
        serializer.serialize_str(&super::encode(bytes.as_ref()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        super::decode(&encoded).map_err(serde::de::Error::custom)
    }
}

/// `#[serde(with = "codec::base64_array")]` for fixed-width byte fields.
pub mod base64_array {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<const N: usize, S>(bytes: &[u8; N], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::encode(bytes))
    }

    pub fn deserialize<'de, const N: usize, D>(deserializer: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let bytes = super::decode(&encoded).map_err(serde::de::Error::custom)?;
        super::to_array("field", &bytes).map_err(serde::de::Error::custom)
    }
}
