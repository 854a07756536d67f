//! Stable content hashing.
//!
//! Any serializable value is reduced to a canonical textual form (object
//! keys sorted lexicographically, arrays in order, scalars in JSON literal
//! form) and digested with a fixed-radix hash. Two values share a digest
//! iff their canonical strings are equal.

use serde::Serialize;
use serde_json::Value;

/// Canonical string of an already-parsed JSON value.
pub fn stable_string(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

/// Canonical string of any serializable value.
pub fn stable_string_of<T: Serialize>(value: &T) -> String {
    let v = serde_json::to_value(value).expect("value serializes to JSON");
    stable_string(&v)
}

/// Stable digest in `h<hex>` form.
pub fn stable_hash<T: Serialize>(value: &T) -> String {
    format!("h{:x}", digest(&stable_string_of(value)))
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => {
            out.push_str(&serde_json::to_string(s).expect("string serializes"));
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
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key).expect("key serializes"));
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
    }
}

/// 64-bit wrapping polynomial radix hash. Stable across platforms and
/// processes; not cryptographic.
fn digest(canonical: &str) -> u64 {
    const RADIX: u64 = 1099511628211;
    const SEED: u64 = 14695981039346656037;
    let mut h = SEED;
    for byte in canonical.bytes() {
        h = h.wrapping_mul(RADIX) ^ u64::from(byte);
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_string_sorts_keys_recursively() {
        let v = json!({"b": 2, "a": 1, "c": {"z": 9, "y": [3, 2, 1]}});
        assert_eq!(
            stable_string(&v),
            r#"{"a":1,"b":2,"c":{"y":[3,2,1],"z":9}}"#
        );
    }

    #[test]
    fn hash_ignores_key_order() {
        let a = json!({"a": 1, "b": 2});
        let b = json!({"b": 2, "a": 1});
        assert_eq!(stable_hash(&a), stable_hash(&b));
    }

    #[test]
    fn hash_is_sensitive_to_values() {
        let a = json!({"b": 2, "a": 1, "c": {"z": 9, "y": [3, 2, 1]}});
        let b = json!({"b": 2, "a": 1, "c": {"z": 9, "y": [3, 2, 2]}});
        assert_ne!(stable_hash(&a), stable_hash(&b));
    }

    #[test]
    fn hash_has_wire_form() {
        let h = stable_hash(&json!({"a": 1}));
        assert!(h.starts_with('h'));
        assert!(h[1..].chars().all(|c| c.is_ascii_hexdigit()));
    }
}
