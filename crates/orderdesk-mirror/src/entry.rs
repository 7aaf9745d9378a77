//! Mapping between local keys and container entries
//!
//! Every mirrored key lives at `container/<prefix><key>` and its value is
//! stored as a JSON string.

use serde_json::Value;

/// Entry name for a local key
#[inline]
#[must_use]
pub fn entry_name(prefix: &str, key: &str) -> String {
    format!("{prefix}{key}")
}

/// Local key for an entry name, `None` when the entry is not mirrored
#[inline]
#[must_use]
pub fn local_key<'a>(prefix: &str, entry: &'a str) -> Option<&'a str> {
    entry.strip_prefix(prefix).filter(|key| !key.is_empty())
}

/// Remote value for a local value; a removal is `None`
#[inline]
#[must_use]
pub fn encode(value: Option<&str>) -> Option<Value> {
    value.map(|v| Value::String(v.to_string()))
}

/// Local value for a remote entry; `null` is a removal
///
/// Non-string values are not the canonical encoding. They are applied as
/// their compact JSON text.
#[must_use]
pub fn decode(entry: &str, value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => {
            tracing::warn!(
                entry,
                kind = value_kind(&other),
                "non-string entry in mirrored container, storing its JSON text"
            );
            Some(other.to_string())
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn names_round_trip_through_prefix() {
        let name = entry_name("app-", "settings");
        assert_eq!(name, "app-settings");
        assert_eq!(local_key("app-", &name), Some("settings"));
    }

    #[test]
    fn foreign_and_bare_prefix_entries_are_ignored() {
        assert_eq!(local_key("app-", "other-settings"), None);
        assert_eq!(local_key("app-", "app-"), None);
    }

    #[test]
    fn decode_handles_every_shape() {
        assert_eq!(decode("app-k", json!("v")), Some("v".to_string()));
        assert_eq!(decode("app-k", Value::Null), None);
        assert_eq!(decode("app-k", json!(42)), Some("42".to_string()));
        assert_eq!(
            decode("app-k", json!({"a": [1, 2]})),
            Some(r#"{"a":[1,2]}"#.to_string())
        );
    }

    #[test]
    fn encode_removal_is_none() {
        assert_eq!(encode(None), None);
        assert_eq!(encode(Some("[]")), Some(json!("[]")));
    }
}
