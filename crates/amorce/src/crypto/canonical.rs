//! Canonical JSON serialization.
//!
//! Every structured payload that gets signed (tool calls, approval
//! details) is first reduced to a canonical form: object keys sorted
//! lexicographically, compact separators, no extra whitespace. Two
//! semantically equal values always produce identical bytes, so a
//! signature made by one party verifies for another regardless of how
//! their serializer orders keys.

use serde_json::Value;

/// Produce a deterministic canonical JSON representation of a value.
pub fn canonicalize(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => serde_json::to_string(s).unwrap_or_default(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(canonicalize).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let pairs: Vec<String> = keys
                .iter()
                .filter_map(|k| {
                    let key = serde_json::to_string(*k).ok()?;
                    let val = canonicalize(map.get(*k)?);
                    Some(format!("{key}:{val}"))
                })
                .collect();
            format!("{{{}}}", pairs.join(","))
        }
    }
}
