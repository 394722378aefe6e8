//! Canonical CBOR encoding for revision signing.
//!
//! This module implements RFC 8949 Core Deterministic Encoding for the small
//! subset of CBOR a revision header needs (integers, byte strings, maps):
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats (timestamps are i64 milliseconds)
//!
//! The signature covers `DOMAIN_TAG || canonical_header`, so the same header
//! produces identical signing bytes on every platform and a revision
//! signature can never be replayed as some other signed message.

use ciborium::value::Value;

use crate::error::CoreError;
use crate::revision::{Revision, RevisionHeader};

/// Domain separation prefix for revision signatures.
pub const DOMAIN_TAG: &[u8] = b"tether/revision/v1";

/// Header field keys. Keys 0-23 encode as single bytes in CBOR.
mod keys {
    pub const VERSION: u64 = 0;
    pub const IDENTITY: u64 = 1;
    pub const SEQUENCE: u64 = 2;
    pub const VALUE: u64 = 3;
    pub const TIMESTAMP: u64 = 4;
}

/// Encode a revision header to canonical CBOR bytes.
pub fn canonical_header_bytes(header: &RevisionHeader) -> Result<Vec<u8>, CoreError> {
    let value = header_to_cbor_value(header);
    let mut buf = Vec::with_capacity(96);
    encode_value_to(&mut buf, &value)?;
    Ok(buf)
}

/// Encode an entire revision: canonical_header || signature.
pub fn canonical_bytes(revision: &Revision) -> Result<Vec<u8>, CoreError> {
    let mut buf = canonical_header_bytes(&revision.header)?;
    buf.extend_from_slice(&revision.signature.0);
    Ok(buf)
}

/// The bytes an identity signs for a header: DOMAIN_TAG || canonical_header.
pub fn signed_message(header: &RevisionHeader) -> Result<Vec<u8>, CoreError> {
    let body = canonical_header_bytes(header)?;
    let mut buf = Vec::with_capacity(DOMAIN_TAG.len() + body.len());
    buf.extend_from_slice(DOMAIN_TAG);
    buf.extend_from_slice(&body);
    Ok(buf)
}

fn header_to_cbor_value(header: &RevisionHeader) -> Value {
    Value::Map(vec![
        (
            Value::Integer(keys::VERSION.into()),
            Value::Integer(header.version.into()),
        ),
        (
            Value::Integer(keys::IDENTITY.into()),
            Value::Bytes(header.identity.0.to_vec()),
        ),
        (
            Value::Integer(keys::SEQUENCE.into()),
            Value::Integer(header.sequence.into()),
        ),
        (
            Value::Integer(keys::VALUE.into()),
            Value::Bytes(header.value.0.to_vec()),
        ),
        (
            Value::Integer(keys::TIMESTAMP.into()),
            Value::Integer(header.timestamp.into()),
        ),
    ])
}

fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<(), CoreError> {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => {
            encode_uint(buf, 2, b.len() as u64);
            buf.extend_from_slice(b);
        }
        Value::Map(entries) => encode_map_canonical(buf, entries)?,
        Value::Float(_) => {
            return Err(CoreError::EncodingError(
                "floats not supported in canonical encoding".into(),
            ))
        }
        _ => {
            return Err(CoreError::EncodingError(
                "unsupported CBOR value type".into(),
            ))
        }
    }
    Ok(())
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n: i128 = i.into();
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // -1 encodes as 0, -2 as 1, ...
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a map with keys sorted by their encoded bytes (major type 5).
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<(), CoreError> {
    let mut pairs: Vec<(Vec<u8>, &Value)> = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value_to(&mut key_buf, k)?;
        pairs.push((key_buf, v));
    }
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}
