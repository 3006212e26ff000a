//! Deep merge of configuration documents.
//!
//! Objects merge key by key, recursively. A `null` (absent) source value never
//! overwrites what is already there; arrays and scalars replace the target.

use serde_json::{Map, Value};

/// Merge `source` into `target` in place, ignoring absent source values.
pub fn merge_ignore_absent(target: &mut Value, source: &Value) {
    match source {
        Value::Null => {}
        Value::Object(source_map) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            if let Value::Object(target_map) = target {
                merge_maps(target_map, source_map);
            }
        }
        other => *target = other.clone(),
    }
}

/// Merge every layer into a fresh document, lowest precedence first.
pub fn merge_layers<'a, I>(layers: I) -> Value
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut merged = Value::Object(Map::new());
    for layer in layers {
        merge_ignore_absent(&mut merged, layer);
    }
    merged
}

fn merge_maps(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        if value.is_null() {
            continue;
        }
        match target.get_mut(key) {
            Some(existing) => merge_ignore_absent(existing, value),
            None => {
                let mut fresh = Value::Null;
                merge_ignore_absent(&mut fresh, value);
                target.insert(key.clone(), fresh);
            }
        }
    }
}
