//! Conversion between in-memory question types/options and their stored form.
//!
//! Encoding is strict; decoding never fails. Rows written by older
//! versions or edited by hand in the store must still load, so unknown
//! type codes become [`DataType::Text`] and unreadable option lists
//! become empty.

use serde_json::Value;

use crate::error::{EventDeskError, EventDeskResult};
use crate::form::DataType;

/// Stored type code for a user-facing label.
pub fn type_code(label: &str) -> EventDeskResult<&'static str> {
    DataType::from_label(label)
        .map(DataType::code)
        .ok_or_else(|| EventDeskError::UnknownType(label.to_string()))
}

/// User-facing label for a stored type code, `Text` when unknown.
pub fn type_label(code: &str) -> &'static str {
    decode_type(code).label()
}

pub fn decode_type(code: &str) -> DataType {
    DataType::from_code(code).unwrap_or_default()
}

/// Options as a JSON array string.
pub fn encode_options(options: &[String]) -> String {
    Value::from(options.to_vec()).to_string()
}

/// Options from either a JSON array or a string holding one.
pub fn decode_options(raw: &Value) -> Vec<String> {
    match raw {
        Value::Array(items) => strings(items),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(items)) => strings(&items),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn strings(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect()
}
