//! Lookup helpers for loosely typed provider JSON

use serde_json::Value;

/// String at `key`, or the first element when the provider sends an array
pub(crate) fn str_at<'a>(item: &'a Value, key: &str) -> Option<&'a str> {
    match item.get(key)? {
        Value::String(s) => Some(s.as_str()),
        Value::Array(items) => items.first().and_then(Value::as_str),
        _ => None,
    }
    .filter(|s| !s.trim().is_empty())
}

/// Owned string at `key`
pub(crate) fn string_at(item: &Value, key: &str) -> Option<String> {
    str_at(item, key).map(|s| s.trim().to_string())
}

/// Number at `key`, also accepting numeric strings
pub(crate) fn u16_at(item: &Value, key: &str) -> Option<u16> {
    match item.get(key)? {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Scalar at `key` rendered as text (numbers included)
pub(crate) fn text_at(item: &Value, key: &str) -> Option<String> {
    match item.get(key)? {
        Value::Number(n) => Some(n.to_string()),
        _ => string_at(item, key),
    }
}
