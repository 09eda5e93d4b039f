// Machine-record handling: fence recognition and the typed defaults merge.
//
// Each block's record is the parsed fence payload overlaid onto the
// defaults record (`type: "", id: "", status: "draft", title: ""`).
// Explicit parsed fields win; required fields are never absent after
// the merge.

use serde_json::{Map, Value};

use crate::types::{MachineRecord, DEFAULT_STATUS};

/// Generic fence label for a block's machine payload.
pub const FENCE_LABEL: &str = "adl";

/// Legacy alias still accepted by the parser.
pub const FENCE_LABEL_LEGACY: &str = "machine";

/// Does this line open a machine payload fence?
pub fn is_fence_open(line: &str) -> bool {
    let Some(label) = line.trim().strip_prefix("```") else {
        return false;
    };
    matches!(label.trim(), FENCE_LABEL | FENCE_LABEL_LEGACY)
}

/// Does this line close a fence?
pub fn is_fence_close(line: &str) -> bool {
    line.trim() == "```"
}

/// Overlay a parsed payload onto the defaults record.
///
/// Scalar values for the required fields are coerced to strings; an
/// explicit null or empty `status` falls back to the default so the
/// status invariant holds. Non-mapping payloads yield the plain defaults.
pub fn overlay_defaults(payload: Option<&Value>) -> MachineRecord {
    let mut record = MachineRecord::default();
    let Some(Value::Object(map)) = payload else {
        return record;
    };

    for (key, value) in map {
        match key.as_str() {
            "type" => record.kind = scalar_string(value).unwrap_or_default(),
            "id" => record.id = scalar_string(value).unwrap_or_default(),
            "status" => {
                record.status = match scalar_string(value) {
                    Some(status) if !status.is_empty() => status,
                    _ => DEFAULT_STATUS.to_string(),
                };
            }
            "title" => record.title = scalar_string(value).unwrap_or_default(),
            _ => {
                record.extra.insert(key.clone(), value.clone());
            }
        }
    }

    record
}

/// The record as a structured value, required fields first, extras in
/// source order. This is the shape dotted-path reads and writes see.
pub fn to_value(record: &MachineRecord) -> Value {
    let mut map = Map::new();
    map.insert("type".to_string(), Value::String(record.kind.clone()));
    map.insert("id".to_string(), Value::String(record.id.clone()));
    map.insert("status".to_string(), Value::String(record.status.clone()));
    map.insert("title".to_string(), Value::String(record.title.clone()));
    for (key, value) in &record.extra {
        map.insert(key.clone(), value.clone());
    }
    Value::Object(map)
}

/// Rebuild a typed record from a structured value (inverse of [`to_value`]).
pub fn from_value(value: &Value) -> MachineRecord {
    overlay_defaults(Some(value))
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
