//! Mapping document transform.
//!
//! A mapping fetched from a live index carries server-generated keys
//! under `settings.index` that the server rejects on create. They are
//! stripped before the mapping is reused, and the shard/replica counts
//! can be overridden in the same pass.

use serde_json::{Map, Value};

/// Keys under `settings.index` that only the server may set.
const SERVER_SETTINGS: [&str; 4] = ["creation_date", "uuid", "version", "provided_name"];

/// Prepare a fetched mapping for index creation: drop server-generated
/// settings and apply shard/replica overrides. `Some(0)` replicas is a
/// valid override (single-node clusters), which is why these are
/// options rather than sentinel integers.
pub fn prepare_for_create(
    mut mapping: Value,
    shards: Option<u32>,
    replicas: Option<u32>,
) -> Value {
    if let Some(index) = mapping
        .pointer_mut("/settings/index")
        .and_then(Value::as_object_mut)
    {
        for key in SERVER_SETTINGS {
            index.remove(key);
        }
    }

    // The store reports these settings as JSON strings, so overrides are
    // written back as strings too.
    if let Some(shards) = shards {
        set_index_setting(&mut mapping, "number_of_shards", shards);
    }
    if let Some(replicas) = replicas {
        set_index_setting(&mut mapping, "number_of_replicas", replicas);
    }

    mapping
}

fn set_index_setting(mapping: &mut Value, key: &str, value: u32) {
    let settings = ensure_object(mapping, "settings");
    let index = ensure_object(settings, "index");
    if let Some(obj) = index.as_object_mut() {
        obj.insert(key.to_string(), Value::String(value.to_string()));
    }
}

fn ensure_object<'a>(value: &'a mut Value, key: &str) -> &'a mut Value {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    let obj = value.as_object_mut().unwrap();
    obj.entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()))
}
