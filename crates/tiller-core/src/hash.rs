//! Deterministic content hashing for structured payloads.
//!
//! Two semantically-equal payloads (same keys and values, independent of key
//! ordering at the encoding boundary) produce the same digest; any value
//! change produces a different digest. Used to stamp audit entries with an
//! integrity hash of the originating payload.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::HashError;

/// Compute the SHA-256 hex digest of a JSON value's canonical encoding.
pub fn content_hash(value: &Value) -> String {
    let mut canonical = String::new();
    write_canonical(value, &mut canonical);
    format!("{:x}", Sha256::digest(canonical.as_bytes()))
}

/// Hash any serializable payload. Fails only when the payload is not
/// JSON-representable (e.g. a map with non-string keys).
pub fn hash_payload<T: Serialize>(payload: &T) -> Result<String, HashError> {
    let value = serde_json::to_value(payload)?;
    Ok(content_hash(&value))
}

/// Write a compact JSON encoding with object keys emitted in sorted order.
///
/// Array order is preserved (sequences are semantically ordered); only
/// object key order is normalized.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // String serialization of a key cannot fail.
                out.push_str(&serde_json::to_string(key).unwrap_or_default());
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => {
            out.push_str(&scalar.to_string());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
