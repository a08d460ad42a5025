//! Structural fingerprints.
//!
//! A fingerprint is the SHA-256 (lowercase hex) of a canonical JSON rendering
//! in which:
//! - object keys are emitted in sorted order,
//! - array elements are emitted sorted by their own canonical rendering,
//! - integral floats render as integers (`3.0` and `3` are the same value).
//!
//! Two values that differ only in key order or array element order therefore
//! share a fingerprint; any other structural difference changes it.
//!
//! `serde_json::Value` is a tree, so there is no cyclic input to handle.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use pp_schemas::Price;

/// Largest integer exactly representable in an f64.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Canonical compact JSON text of `v`.
pub fn canonical_json(v: &Value) -> String {
    let mut out = String::new();
    write_canonical(v, &mut out);
    out
}

fn write_canonical(v: &Value, out: &mut String) {
    match v {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (k, val)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Value's Display performs JSON string escaping.
                out.push_str(&Value::String(k.clone()).to_string());
                out.push(':');
                write_canonical(val, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            let mut rendered: Vec<String> = items.iter().map(canonical_json).collect();
            rendered.sort();
            out.push('[');
            out.push_str(&rendered.join(","));
            out.push(']');
        }
        Value::Number(n) => {
            match n.as_f64() {
                Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < MAX_SAFE_INTEGER => {
                    out.push_str(&(f as i64).to_string());
                }
                _ => out.push_str(&n.to_string()),
            }
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Order-insensitive structural hash of `v`.
pub fn fingerprint(v: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(v).as_bytes());
    hex::encode(hasher.finalize())
}

/// Fingerprint of any serde value. Values that cannot be represented as JSON
/// (non-string map keys) hash as `null`.
pub fn fingerprint_of<T: Serialize + ?Sized>(value: &T) -> String {
    fingerprint(&serde_json::to_value(value).unwrap_or(Value::Null))
}

/// Storage key of a price: the fingerprint of its `(id, fueltype)` pair.
pub fn price_key(price: &Price) -> String {
    fingerprint(&price.key_document())
}

/// Change hash of a whole collection. Insensitive to document order.
pub fn collection_hash(docs: &[Value]) -> String {
    fingerprint(&Value::Array(docs.to_vec()))
}
