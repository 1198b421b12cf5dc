//! Deterministic cache keys
//!
//! A result key is `tool:<name>:<digest>`, where the digest is the first 32
//! hex characters of SHA-256 over the tool name and the canonical
//! (object-keys-sorted) JSON of its arguments. Argument order therefore
//! never changes the key.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

const DIGEST_HEX_LEN: usize = 32;

/// Key for a tool result
pub fn result_key(tool_name: &str, arguments: &HashMap<String, Value>) -> String {
    let mut sorted: Vec<(&String, &Value)> = arguments.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let mut canonical = String::from("{");
    for (i, (k, v)) in sorted.into_iter().enumerate() {
        if i > 0 {
            canonical.push(',');
        }
        canonical.push_str(&Value::String(k.clone()).to_string());
        canonical.push(':');
        canonical.push_str(&canonical_json(v));
    }
    canonical.push('}');

    let mut hasher = Sha256::new();
    hasher.update(tool_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(canonical.as_bytes());
    let digest = hex::encode(hasher.finalize());

    format!("tool:{}:{}", tool_name, &digest[..DIGEST_HEX_LEN])
}

/// JSON text with object keys sorted at every depth
pub fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let body: Vec<String> = entries
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), canonical_json(v)))
                .collect();
            format!("{{{}}}", body.join(","))
        }
        Value::Array(items) => {
            let body: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", body.join(","))
        }
        scalar => scalar.to_string(),
    }
}

/// Where the metadata of `key` is stored
pub fn meta_key(key: &str) -> String {
    format!("{}:meta", key)
}

/// Where chunk `index` (0-based) of `key` is stored
pub fn chunk_key(key: &str, index: usize) -> String {
    format!("{}:chunk:{}", key, index)
}

/// Entry a storage key belongs to: `k:meta` and `k:chunk:<i>` map to `k`
pub fn entry_key(storage_key: &str) -> &str {
    if let Some(root) = storage_key.strip_suffix(":meta") {
        return root;
    }
    match storage_key.rsplit_once(":chunk:") {
        Some((root, index)) if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) => {
            root
        }
        _ => storage_key,
    }
}
