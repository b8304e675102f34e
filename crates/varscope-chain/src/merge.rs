//! Recursive merge of variable values.
//!
//! - Mappings: merged by key, recursing where both sides hold a mapping
//! - Arrays: replaced by the overlay
//! - Scalars and null: replaced by the overlay

use serde_json::Value;

/// Deep merge two values, `overlay` taking precedence.
///
/// Keys unique to either side pass through unchanged. Keys present on both
/// sides recurse when both values are mappings; otherwise the overlay value
/// replaces the base value.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Fold the values found for one key across layers, base layer first.
///
/// Consecutive mappings combine through [`deep_merge`]; a non-mapping value
/// discards whatever was accumulated below it. An empty input yields null.
pub fn merge_layers<I>(values: I) -> Value
where
    I: IntoIterator<Item = Value>,
{
    values.into_iter().fold(Value::Null, deep_merge)
}
