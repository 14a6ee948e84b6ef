//! Lenient typed accessors over JSON objects.
//!
//! A missing or wrongly typed field yields the supplied fallback, which is
//! normally the value already in memory. Nothing here fails.

use serde_json::{Map, Value};

pub type Record = Map<String, Value>;

pub fn get_f32(record: &Record, key: &str, fallback: f32) -> f32 {
    record
        .get(key)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .map(|v| v as f32)
        .unwrap_or(fallback)
}

pub fn get_i64(record: &Record, key: &str, fallback: i64) -> i64 {
    match record.get(key) {
        Some(v) => v
            .as_i64()
            .or_else(|| v.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(fallback),
        None => fallback,
    }
}

pub fn get_u32(record: &Record, key: &str, fallback: u32) -> u32 {
    u32::try_from(get_i64(record, key, fallback as i64)).unwrap_or(fallback)
}

pub fn get_bool(record: &Record, key: &str, fallback: bool) -> bool {
    record.get(key).and_then(Value::as_bool).unwrap_or(fallback)
}

pub fn get_string(record: &Record, key: &str, fallback: &str) -> String {
    record
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string()
}

/// String array; non-string entries are skipped.
pub fn get_string_array(record: &Record, key: &str) -> Option<Vec<String>> {
    record.get(key).and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}
