// Generic record trait and helpers for JSON-object records

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Field every record carries as its identity
pub const ID_FIELD: &str = "id";

/// Field refreshed on every partial update
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Core trait that any storable record must implement
pub trait Record: Serialize + for<'de> Deserialize<'de> + Clone + Send + Sync + 'static {
    /// Unique identifier for this record
    fn id(&self) -> &str;

    /// Collection key for this record type (e.g., "tasks", "groups")
    /// Determines the local slot and the field in the shared remote document
    fn collection_name() -> &'static str
    where
        Self: Sized;

    /// Bring a raw record to the current field layout before it is matched or decoded
    fn normalize(_record: &mut Value)
    where
        Self: Sized,
    {
    }
}

/// Generate a new record ID of the form `{prefix}_{uuid}`
pub fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::now_v7().simple())
}

/// Helper function to get current timestamp in milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Extract the ID of a raw JSON record, if it has one
pub fn record_id(record: &Value) -> Option<&str> {
    record.get(ID_FIELD).and_then(Value::as_str)
}

/// Shallow-merge `fields` over `record`
///
/// Fields absent from `fields` keep their current values. `updatedAt` is set to
/// `now` unless the caller supplied it explicitly. The record's `id` is never
/// overwritten. Non-object records are replaced by the merged fields.
pub fn merge_fields(record: &Value, fields: &Map<String, Value>, now: i64) -> Value {
    let mut merged = match record {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };

    for (name, value) in fields {
        if name == ID_FIELD {
            continue;
        }
        merged.insert(name.clone(), value.clone());
    }

    if !fields.contains_key(UPDATED_AT_FIELD) {
        merged.insert(UPDATED_AT_FIELD.to_string(), Value::from(now));
    }

    Value::Object(merged)
}
