//! JSON tree operations with realtime-database semantics
//!
//! - `null` never exists as a stored value: writing it removes the node
//! - objects left empty by a removal disappear with it
//! - intermediate objects are created on demand

use crate::path::RemotePath;
use serde_json::{Map, Value};

/// Value stored at `path`, `None` when absent
#[must_use]
pub fn value_at(root: &Value, path: &RemotePath) -> Option<Value> {
    let mut node = root;
    for segment in path.segments() {
        node = node.as_object()?.get(segment)?;
    }
    if is_empty_node(node) {
        None
    } else {
        Some(node.clone())
    }
}

/// Overwrite the node at `path`; `None` or `null` removes it
pub fn set_at(root: &mut Value, path: &RemotePath, value: Option<Value>) {
    let value = value.map(prune).filter(|v| !is_empty_node(v));
    set_segments(root, path.segments(), value);
}

/// Apply a partial update: each key of `updates` is a path relative to
/// `path`, written independently
pub fn merge_at(root: &mut Value, path: &RemotePath, updates: Map<String, Value>) {
    for (relative, value) in updates {
        let target = relative
            .split('/')
            .filter(|s| !s.is_empty())
            .fold(path.segments().to_vec(), |mut acc, s| {
                acc.push(s.to_string());
                acc
            });
        let value = Some(prune(value)).filter(|v| !is_empty_node(v));
        set_segments(root, &target, value);
    }
}

/// Check if a node holds nothing
#[inline]
#[must_use]
pub fn is_empty_node(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Strip nulls and empty objects from a value
#[must_use]
pub fn prune(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let pruned: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, prune(v)))
                .filter(|(_, v)| !is_empty_node(v))
                .collect();
            Value::Object(pruned)
        }
        other => other,
    }
}

fn set_segments(node: &mut Value, segments: &[String], value: Option<Value>) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value.unwrap_or(Value::Null);
        return;
    };

    match value {
        Some(value) => {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            if let Value::Object(map) = node {
                let child = map.entry(head.clone()).or_insert(Value::Null);
                set_segments(child, rest, Some(value));
            }
        }
        None => {
            let now_empty = match node {
                Value::Object(map) => {
                    if rest.is_empty() {
                        map.remove(head);
                    } else if let Some(child) = map.get_mut(head) {
                        set_segments(child, rest, None);
                        if is_empty_node(child) {
                            map.remove(head);
                        }
                    }
                    map.is_empty()
                }
                _ => false,
            };
            if now_empty {
                *node = Value::Null;
            }
        }
    }
}
