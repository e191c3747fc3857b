// Hashing helpers: API key digests, canonical JSON digests and Anchor discriminators.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

// Domain separation constants so a key digest can never collide with a metadata digest.
const API_KEY_DOMAIN: &[u8] = b"REALSTACK_APIKEY";
const METADATA_DOMAIN: &[u8] = b"REALSTACK_ASSET";

/// A helper function to sort a JSON object's keys recursively.
/// This is essential for canonical serialization.
fn sort_json_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted_map: BTreeMap<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), sort_json_value(v)))
                .collect();
            Value::Object(sorted_map.into_iter().collect())
        }
        Value::Array(arr) => {
            let sorted_arr = arr.iter().map(sort_json_value).collect();
            Value::Array(sorted_arr)
        }
        _ => value.clone(),
    }
}

/// Hashes a JSON value into a hex digest using canonical (key-sorted) serialization.
pub fn canonical_digest(value: &Value) -> String {
    let sorted_value = sort_json_value(value);
    // `Value`'s Display is its compact JSON form and cannot fail.
    let canonical_string = sorted_value.to_string();

    let mut hasher = Sha256::new();
    hasher.update(METADATA_DOMAIN);
    hasher.update(canonical_string.as_bytes());
    hex::encode(hasher.finalize())
}

/// Digest under which an API key is kept in memory.
pub fn hash_api_key(token: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(API_KEY_DOMAIN);
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Anchor instruction discriminator: first 8 bytes of `sha256("global:<name>")`.
pub fn anchor_discriminator(instruction: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("global:{}", instruction).as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn digest_ignores_key_order() {
        let a = json!({ "b": 1, "a": { "y": true, "x": [1, 2] } });
        let b = json!({ "a": { "x": [1, 2], "y": true }, "b": 1 });
        assert_eq!(canonical_digest(&a), canonical_digest(&b));
        assert_ne!(canonical_digest(&a), canonical_digest(&json!({ "b": 2 })));
    }

    #[test]
    fn discriminator_matches_anchor_convention() {
        // Value produced by Anchor for `global:initialize`.
        assert_eq!(
            anchor_discriminator("initialize"),
            [175, 175, 109, 31, 13, 152, 155, 237]
        );
    }

    #[test]
    fn api_key_digest_is_stable() {
        assert_eq!(hash_api_key("k1"), hash_api_key("k1"));
        assert_ne!(hash_api_key("k1"), hash_api_key("k2"));
    }
}
