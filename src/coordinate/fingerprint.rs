//! Request fingerprinting — stable cache keys for (endpoint, payload) pairs.
//!
//! Two calls with the same endpoint and semantically identical payloads must
//! map to the same key, regardless of JSON object key insertion order. The
//! payload is rendered in canonical form (objects with sorted keys at every
//! nesting level) before hashing, so logically equal values never diverge.

use serde_json::Value;
use sha3::{Digest, Sha3_256};

/// Number of digest bytes kept in the key. 128 bits is enough to make
/// accidental collisions negligible; cryptographic strength is not required.
const DIGEST_BYTES: usize = 16;

/// Derive the fingerprint for a request.
///
/// The endpoint id is concatenated with the payload digest so two endpoints
/// taking identical payloads can never collide. Pure and total: every input
/// maps to exactly one output.
pub fn fingerprint(endpoint_id: &str, payload: &Value) -> String {
    let canonical = canonical_json(payload);
    let digest = Sha3_256::digest(canonical.as_bytes());
    format!("{}:{}", endpoint_id, hex::encode(&digest[..DIGEST_BYTES]))
}

/// Render a JSON value with object keys sorted at every level.
///
/// Arrays keep their order (order is semantically significant there);
/// scalars use `serde_json`'s standard rendering.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

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
                // Keys and scalars go through serde_json so escaping and
                // number formatting match the standard serializer exactly.
                out.push_str(&Value::String((*key).clone()).to_string());
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
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fingerprint_stable_across_calls() {
        let payload = json!({"user": "A", "limit": 10});
        let a = fingerprint("getBalance", &payload);
        let b = fingerprint("getBalance", &payload);
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_ignores_key_insertion_order() {
        let a: Value = serde_json::from_str(r#"{"user":"A","limit":10,"nested":{"x":1,"y":2}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"nested":{"y":2,"x":1},"limit":10,"user":"A"}"#).unwrap();
        assert_eq!(fingerprint("getBalance", &a), fingerprint("getBalance", &b));
    }

    #[test]
    fn test_fingerprint_differs_across_endpoints() {
        let payload = json!({"user": "A"});
        assert_ne!(
            fingerprint("getBalance", &payload),
            fingerprint("getOrders", &payload)
        );
    }

    #[test]
    fn test_fingerprint_differs_across_payloads() {
        assert_ne!(
            fingerprint("getBalance", &json!({"user": "A"})),
            fingerprint("getBalance", &json!({"user": "B"}))
        );
    }

    #[test]
    fn test_canonical_json_sorts_nested_keys() {
        let v: Value = serde_json::from_str(r#"{"b":{"d":2,"c":1},"a":[3,1,2]}"#).unwrap();
        assert_eq!(canonical_json(&v), r#"{"a":[3,1,2],"b":{"c":1,"d":2}}"#);
    }

    #[test]
    fn test_canonical_json_preserves_array_order() {
        let v = json!([2, 1, {"z": 0, "a": 0}]);
        assert_eq!(canonical_json(&v), r#"[2,1,{"a":0,"z":0}]"#);
    }

    #[test]
    fn test_fingerprint_key_shape() {
        let key = fingerprint("getBalance", &json!({"user": "A"}));
        let (prefix, digest) = key.split_once(':').unwrap();
        assert_eq!(prefix, "getBalance");
        assert_eq!(digest.len(), DIGEST_BYTES * 2);
    }
}
