// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical event encoding and CRC-32 protection.
//!
//! The canonical form is compact JSON with lexicographically sorted keys,
//! Unicode preserved, and the `crc32` field forced to the empty string. Its
//! UTF-8 bytes are the CRC-32/IEEE input. Readers that re-order keys or
//! truncate a line change the checksum and the record is treated as corrupt.

use serde_json::Value;
use thiserror::Error;

use crate::event::Event;

/// Errors from canonical encoding
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event did not encode to a JSON object")]
    NotAnObject,
}

/// Canonical JSON string of an event: sorted keys, no whitespace, `crc32`
/// forced to `""`.
///
/// serde_json objects are backed by `BTreeMap`, so key order is
/// lexicographic by construction.
pub fn canonical_json(event: &Event) -> Result<String, CodecError> {
    let value = serde_json::to_value(event)?;
    canonical_json_value(&value)
}

/// Canonical form of a raw JSON value (used when reading lines whose shape
/// is unknown; CRC verification must not depend on a successful typed
/// decode).
pub fn canonical_json_value(value: &Value) -> Result<String, CodecError> {
    let mut value = value.clone();
    let obj = value.as_object_mut().ok_or(CodecError::NotAnObject)?;
    obj.insert("crc32".to_string(), Value::String(String::new()));
    Ok(serde_json::to_string(&value)?)
}

/// CRC-32/IEEE of the canonical encoding, as 8 uppercase hex digits.
pub fn compute_crc32(event: &Event) -> Result<String, CodecError> {
    let canonical = canonical_json(event)?;
    Ok(format!("{:08X}", crc32fast::hash(canonical.as_bytes())))
}

/// CRC over a raw JSON value.
pub fn compute_crc32_value(value: &Value) -> Result<String, CodecError> {
    let canonical = canonical_json_value(value)?;
    Ok(format!("{:08X}", crc32fast::hash(canonical.as_bytes())))
}

/// Recompute and compare. An absent or empty `crc32` field fails closed.
pub fn verify_crc32(event: &Event) -> bool {
    let Some(stored) = event.crc32.as_deref() else {
        return false;
    };
    if stored.is_empty() {
        return false;
    }
    match compute_crc32(event) {
        Ok(expected) => constant_time_eq(stored.as_bytes(), expected.as_bytes()),
        Err(_) => false,
    }
}

/// CRC verification over a raw JSON value.
pub fn verify_crc32_value(value: &Value) -> bool {
    let Some(stored) = value.get("crc32").and_then(Value::as_str) else {
        return false;
    };
    if stored.is_empty() {
        return false;
    }
    match compute_crc32_value(value) {
        Ok(expected) => constant_time_eq(stored.as_bytes(), expected.as_bytes()),
        Err(_) => false,
    }
}

/// Length-tolerant constant-time byte comparison.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let mut diff = a.len() ^ b.len();
    for i in 0..a.len().min(b.len()) {
        diff |= (a[i] ^ b[i]) as usize;
    }
    diff == 0
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
