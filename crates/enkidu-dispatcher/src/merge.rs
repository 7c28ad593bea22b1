//! Recursive merge of JSON objects and arrays.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Cannot merge {left} with {right}; both sides must be objects or both arrays")]
    Mismatch {
        left: &'static str,
        right: &'static str,
    },
}

/// Deep-merge `overlay` onto a copy of `base`.
///
/// For objects, every key of `overlay` is set on the copy; when both values
/// are objects (or both arrays) they are merged recursively.
///
/// For arrays, positions where both values are objects (or both arrays) are
/// merged in place, and every other value of `overlay` that differs from the
/// value at the same position in `base` is appended.
///
/// ```rust
/// use enkidu_dispatcher::merge::deep_merge;
/// use serde_json::json;
///
/// let merged = deep_merge(
///     &json!({"foo": "bar", "bingo": "dingo"}),
///     &json!({"baz": "quux", "bingo": "bongo"}),
/// )
/// .unwrap();
/// assert_eq!(merged, json!({"foo": "bar", "bingo": "bongo", "baz": "quux"}));
/// ```
pub fn deep_merge(base: &Value, overlay: &Value) -> Result<Value, MergeError> {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, new_value) in overlay_map {
                let value = match merged.get(key) {
                    Some(old_value) if mergeable(old_value, new_value) => {
                        deep_merge(old_value, new_value)?
                    }
                    _ => new_value.clone(),
                };
                merged.insert(key.clone(), value);
            }
            Ok(Value::Object(merged))
        }
        (Value::Array(base_items), Value::Array(overlay_items)) => {
            let mut merged = base_items.clone();
            let mut appended = Vec::new();
            for (index, new_value) in overlay_items.iter().enumerate() {
                match base_items.get(index) {
                    Some(old_value) if mergeable(old_value, new_value) => {
                        merged[index] = deep_merge(old_value, new_value)?;
                    }
                    Some(old_value) if old_value == new_value => {}
                    _ => appended.push(new_value.clone()),
                }
            }
            merged.extend(appended);
            Ok(Value::Array(merged))
        }
        _ => Err(MergeError::Mismatch {
            left: kind(base),
            right: kind(overlay),
        }),
    }
}

fn mergeable(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::Object(_), Value::Object(_)) | (Value::Array(_), Value::Array(_))
    )
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
