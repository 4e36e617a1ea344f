//! Deterministic snapshot testing utilities.
//!
//! Values are serialized as canonical pretty JSON with object keys sorted, so
//! two runs can be compared by digest.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

/// Canonical pretty JSON: sorted object keys, trailing newline.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value).context("Failed to serialize snapshot value")?;
    let value = canonicalize_value(value);
    let mut s = serde_json::to_string_pretty(&value).context("Failed to format snapshot JSON")?;
    s.push('\n');
    Ok(s)
}

fn canonicalize_value(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut out = serde_json::Map::with_capacity(entries.len());
            for (k, v) in entries {
                out.insert(k, canonicalize_value(v));
            }
            Value::Object(out)
        }
        Value::Array(values) => Value::Array(values.into_iter().map(canonicalize_value).collect()),
        other => other,
    }
}

/// Hex blake3 digest of the canonical JSON form of `value`.
///
/// Two values with equal digests serialized identically, which is what replay
/// determinism checks need.
pub fn json_digest<T: Serialize>(value: &T) -> Result<String> {
    let canonical = canonical_json(value)?;
    Ok(blake3::hash(canonical.as_bytes()).to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_does_not_change_digest() {
        let a = json!({ "seed": 42, "tick": 7, "explored": [[1, 2]] });
        let b = json!({ "tick": 7, "explored": [[1, 2]], "seed": 42 });
        assert_eq!(json_digest(&a).unwrap(), json_digest(&b).unwrap());
        assert_ne!(
            json_digest(&a).unwrap(),
            json_digest(&json!({ "seed": 43 })).unwrap()
        );
    }

    #[test]
    fn canonical_json_sorts_nested_keys() {
        let out = canonical_json(&json!({ "b": { "z": 1, "a": 2 }, "a": 0 })).unwrap();
        let a = out.find("\"a\": 0").unwrap();
        let b = out.find("\"b\"").unwrap();
        assert!(a < b);
        assert!(out.find("\"a\": 2").unwrap() < out.find("\"z\"").unwrap());
        assert!(out.ends_with('\n'));
    }
}
