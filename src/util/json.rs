//! Tolerant accessors over duck-typed provider JSON.
//!
//! External sources disagree on field names and scalar types; these helpers
//! walk an ordered alias list per target field and coerce scalars the way the
//! providers actually ship them (numeric ids serialized as numbers or strings,
//! tag lists as arrays or comma-joined strings).

use serde_json::Value;

/// First non-empty string among the named fields, in priority order.
/// Numbers are coerced to their decimal string form.
pub fn first_string(raw: &Value, fields: &[&str]) -> Option<String> {
    for field in fields {
        match raw.get(field) {
            Some(Value::String(s)) => {
                let text = s.trim();
                if !text.is_empty() {
                    return Some(text.to_string());
                }
            }
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// First parseable integer among the named fields (string digits accepted).
pub fn first_i64(raw: &Value, fields: &[&str]) -> Option<i64> {
    for field in fields {
        if let Some(value) = raw.get(field) {
            if let Some(n) = value.as_i64() {
                return Some(n);
            }
            if let Some(s) = value.as_str() {
                if let Ok(n) = s.trim().parse::<i64>() {
                    return Some(n);
                }
            }
        }
    }
    None
}

/// Non-null field lookup: a field that is present but `null` does not count.
pub fn non_null<'a>(raw: &'a Value, field: &str) -> Option<&'a Value> {
    raw.get(field).filter(|v| !v.is_null())
}

/// String list from an array value or a comma-separated string.
pub fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
