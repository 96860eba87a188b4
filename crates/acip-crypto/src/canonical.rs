//! Canonical JSON serialization
//!
//! The canonical form is the single hash input for frames, manifests, and
//! persisted kernel state:
//!
//! - object keys emitted in lexicographic (codepoint) order
//! - arrays preserve input order
//! - integers only; floats are rejected outright
//! - strings carry standard JSON escapes, no other normalization
//! - no whitespace between tokens
//!
//! The output is byte-stable across runs and processes for the same input.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::hash::sha256_hex;

/// Maximum nesting depth accepted during canonicalization
pub const MAX_DEPTH: usize = 128;

/// Errors that can occur while producing the canonical form
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CanonicalError {
    #[error("float not allowed: canonical form requires integer-only numbers")]
    FloatNotAllowed,

    #[error("number out of range: {value} does not fit in a signed 64-bit integer")]
    NumberOutOfRange { value: String },

    #[error("max depth exceeded: value nested deeper than {max_depth} levels")]
    MaxDepthExceeded { max_depth: usize },

    #[error("serialization error: {message}")]
    Serialization { message: String },
}

/// Serialize any value into its canonical string form
pub fn canonical_string<T: Serialize>(value: &T) -> Result<String, CanonicalError> {
    let value = serde_json::to_value(value).map_err(|e| CanonicalError::Serialization {
        message: e.to_string(),
    })?;
    canonical_json_string(&value)
}

/// Produce the canonical string form of an already-parsed JSON value
pub fn canonical_json_string(value: &Value) -> Result<String, CanonicalError> {
    let mut out = String::new();
    write_canonical(value, &mut out, 0)?;
    Ok(out)
}

/// Lowercase hex SHA-256 over the canonical form
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> Result<String, CanonicalError> {
    Ok(sha256_hex(canonical_string(value)?.as_bytes()))
}

fn write_canonical(value: &Value, out: &mut String, depth: usize) -> Result<(), CanonicalError> {
    if depth > MAX_DEPTH {
        return Err(CanonicalError::MaxDepthExceeded { max_depth: MAX_DEPTH });
    }

    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                out.push_str(&i.to_string());
            } else if n.as_u64().is_some() {
                return Err(CanonicalError::NumberOutOfRange {
                    value: n.to_string(),
                });
            } else {
                return Err(CanonicalError::FloatNotAllowed);
            }
        }
        Value::String(s) => {
            let escaped =
                serde_json::to_string(s).map_err(|e| CanonicalError::Serialization {
                    message: e.to_string(),
                })?;
            out.push_str(&escaped);
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out, depth + 1)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let escaped =
                    serde_json::to_string(key).map_err(|e| CanonicalError::Serialization {
                        message: e.to_string(),
                    })?;
                out.push_str(&escaped);
                out.push(':');
                write_canonical(&map[key.as_str()], out, depth + 1)?;
            }
            out.push('}');
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    #[test]
    fn sorts_keys_and_strips_whitespace() {
        let value = json!({"z": 1, "a": {"m": true, "b": "x"}});
        assert_eq!(
            canonical_json_string(&value).unwrap(),
            r#"{"a":{"b":"x","m":true},"z":1}"#
        );
    }

    #[test]
    fn arrays_preserve_input_order() {
        let value = json!({"seq": [3, 1, 2]});
        assert_eq!(canonical_json_string(&value).unwrap(), r#"{"seq":[3,1,2]}"#);
    }

    #[test]
    fn floats_are_rejected() {
        let value = json!({"ratio": 0.5});
        assert_eq!(
            canonical_json_string(&value).unwrap_err(),
            CanonicalError::FloatNotAllowed
        );
    }

    #[test]
    fn u64_above_i64_range_is_rejected() {
        let value = json!({"n": u64::MAX});
        assert!(matches!(
            canonical_json_string(&value).unwrap_err(),
            CanonicalError::NumberOutOfRange { .. }
        ));
    }

    #[test]
    fn negative_integers_pass_through() {
        let value = json!({"n": -42});
        assert_eq!(canonical_json_string(&value).unwrap(), r#"{"n":-42}"#);
    }

    #[test]
    fn strings_use_standard_escapes() {
        let value = json!({"s": "line\n\"quoted\""});
        assert_eq!(
            canonical_json_string(&value).unwrap(),
            r#"{"s":"line\n\"quoted\""}"#
        );
    }

    #[test]
    fn depth_limit_is_enforced() {
        let mut value = json!(1);
        for _ in 0..(MAX_DEPTH + 2) {
            value = json!([value]);
        }
        assert!(matches!(
            canonical_json_string(&value).unwrap_err(),
            CanonicalError::MaxDepthExceeded { .. }
        ));
    }

    #[test]
    fn hash_is_lowercase_hex() {
        let hash = canonical_hash_hex(&json!({"a": 1})).unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    /// Strategy for scalar values legal in canonical documents.
    fn scalar() -> impl Strategy<Value = serde_json::Value> {
        prop_oneof![
            any::<bool>().prop_map(serde_json::Value::from),
            any::<i64>().prop_map(serde_json::Value::from),
            "[a-zA-Z0-9 _.-]{0,24}".prop_map(serde_json::Value::from),
        ]
    }

    proptest! {
        /// Property: insertion order of object keys never changes the
        /// canonical bytes.
        #[test]
        fn prop_key_order_is_irrelevant(
            entries in prop::collection::btree_map("[a-z_]{1,12}", scalar(), 1..8)
        ) {
            let forward: serde_json::Map<String, serde_json::Value> =
                entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            let reverse: serde_json::Map<String, serde_json::Value> =
                entries.iter().rev().map(|(k, v)| (k.clone(), v.clone())).collect();

            let a = canonical_json_string(&serde_json::Value::Object(forward)).unwrap();
            let b = canonical_json_string(&serde_json::Value::Object(reverse)).unwrap();
            prop_assert_eq!(a, b);
        }

        /// Property: canonicalization is deterministic for the same input.
        #[test]
        fn prop_byte_stable(
            entries in prop::collection::btree_map("[a-z_]{1,12}", scalar(), 0..8)
        ) {
            let map: serde_json::Map<String, serde_json::Value> =
                entries.into_iter().collect();
            let value = serde_json::Value::Object(map);
            let a = canonical_json_string(&value).unwrap();
            let b = canonical_json_string(&value).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
