//! Decoding of scanned element labels.
//!
//! A label carries either the bare element code or a JSON object with an
//! `elementId` (or `id`) field.

use serde_json::Value;

/// Extract the element code from a scanned payload.
///
/// Returns `None` for an empty payload.
pub fn element_code(payload: &str) -> Option<String> {
    let payload = payload.trim();
    if payload.is_empty() {
        return None;
    }

    let code = match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(map)) => ["elementId", "id"]
            .iter()
            .find_map(|key| map.get(*key).and_then(value_as_code)),
        _ => None,
    };
    Some(code.unwrap_or_else(|| payload.to_string()))
}

fn value_as_code(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
