//! Serde helpers for fixed-size byte arrays encoded as lowercase hex strings.
//!
//! Use with `#[serde(with = "tether_core::serde_hex")]`.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

/// Serialize a byte array as a hex string.
pub fn serialize<S, const N: usize>(bytes: &[u8; N], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&hex::encode(bytes))
}

/// Deserialize a byte array from a hex string of exactly `2 * N` characters.
pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    decode_array(&s).map_err(D::Error::custom)
}

/// Decode a hex string into a fixed-size array.
pub fn decode_array<const N: usize>(s: &str) -> Result<[u8; N], hex::FromHexError> {
    let mut arr = [0u8; N];
    hex::decode_to_slice(s, &mut arr)?;
    Ok(arr)
}
