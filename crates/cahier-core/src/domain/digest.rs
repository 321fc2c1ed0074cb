//! Canonical JSON digest for version payloads.
//!
//! Object keys are sorted by UTF-16 code units before hashing so that two
//! equal payloads always produce the same SHA-256 hex digest regardless of
//! field insertion order.

use sha2::{Digest, Sha256};

fn sort_keys_utf16(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().collect();
            keys.sort_by(|a, b| a.encode_utf16().cmp(b.encode_utf16()));

            let mut sorted = serde_json::Map::new();
            for key in keys {
                if let Some(v) = map.get(key) {
                    sorted.insert(key.to_string(), sort_keys_utf16(v));
                }
            }
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(sort_keys_utf16).collect())
        }
        other => other.clone(),
    }
}

/// Canonical byte encoding of a JSON value.
pub fn canonical_json(value: &serde_json::Value) -> Vec<u8> {
    // Serializing a Value cannot fail: keys are strings and numbers finite
    serde_json::to_vec(&sort_keys_utf16(value)).unwrap_or_default()
}

/// SHA-256 hex digest of the canonical encoding.
pub fn payload_digest(value: &serde_json::Value) -> String {
    hex::encode(Sha256::digest(canonical_json(value)))
}
