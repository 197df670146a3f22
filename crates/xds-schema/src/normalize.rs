//! Kind normalization.
//!
//! Every mapping handed to the compiler or the builder must name its kind.
//! [`normalize`] fills the gaps depth-first: the root defaults to
//! [`DYNAMIC_KIND`], a nested mapping defaults to the key it sits under,
//! and list elements inherit the key of their list. An existing `kind` is
//! never touched. Added entries go to the end of their mapping.

use serde_json::Value as Json;
use xds_core::Mapping;

/// Kind assumed for a root mapping that names none.
pub const DYNAMIC_KIND: &str = "DynamicClass";

/// The key holding a mapping's kind.
pub const KIND_KEY: &str = "kind";

/// Fill missing `kind` entries throughout `data`.
pub fn normalize(data: &mut Mapping) {
    fill_mapping(DYNAMIC_KIND, data);
}

/// The textual kind of a mapping, if it has one.
pub fn kind_of(data: &Mapping) -> Option<&str> {
    data.get(KIND_KEY).and_then(Json::as_str)
}

fn fill_mapping(key: &str, map: &mut Mapping) {
    if !map.contains_key(KIND_KEY) {
        map.insert(KIND_KEY.to_string(), Json::String(key.to_string()));
    }
    for (child_key, child) in map.iter_mut() {
        fill_value(child_key, child);
    }
}

fn fill_value(key: &str, value: &mut Json) {
    match value {
        Json::Object(map) => fill_mapping(key, map),
        Json::Array(items) => {
            for item in items {
                fill_value(key, item);
            }
        }
        _ => {}
    }
}
