//! Deep merge of loaded configuration data into the value store.
//!
//! Objects are merged key by key, recursively. Any other overlay value
//! (scalars, arrays, `null`) replaces the base value at that position. Keys
//! absent from the overlay are preserved.
//!
//! # Example
//!
//! ```
//! use config_schema_core::deep_merge;
//! use serde_json::json;
//!
//! let mut base = json!({"ip": "127.0.0.1", "sub": {"arg1": 1, "arg2": "x"}});
//! deep_merge(&mut base, json!({"sub": {"arg2": "y"}, "port": 80}));
//! assert_eq!(base, json!({"ip": "127.0.0.1", "port": 80, "sub": {"arg1": 1, "arg2": "y"}}));
//! ```

use serde_json::{Map, Value};

/// Merges `overlay` into `base` in place; overlay values win on conflict.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => merge_maps(base, overlay),
        (base, overlay) => *base = overlay,
    }
}

pub(crate) fn merge_maps(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, value) in overlay {
        if let Some(existing) = base.get_mut(&key) {
            if existing.is_object() && value.is_object() {
                deep_merge(existing, value);
                continue;
            }
        }
        base.insert(key, value);
    }
}
