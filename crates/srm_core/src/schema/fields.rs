//! Field readers for untyped bundles.
//!
//! Each reader records its problem in the shared `ValidationErrors` and
//! returns `None`, so the caller keeps checking sibling fields.

use serde_json::{Map, Value};

use crate::error::ValidationErrors;
use crate::models::{EngineType, FilePath, PathInput};

/// JSON kind name for error messages.
pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn required<'a>(
    map: &'a Map<String, Value>,
    key: &str,
    errors: &mut ValidationErrors,
) -> Option<&'a Value> {
    let value = map.get(key);
    if value.is_none() {
        errors.push(key, "is required");
    }
    value
}

pub(crate) fn string(
    map: &Map<String, Value>,
    key: &str,
    errors: &mut ValidationErrors,
) -> Option<String> {
    match required(map, key, errors)? {
        Value::String(s) if s.is_empty() => {
            errors.push(key, "must not be empty");
            None
        }
        Value::String(s) => Some(s.clone()),
        other => {
            errors.push(key, format!("expected a string, got {}", kind(other)));
            None
        }
    }
}

/// String or null. `default_missing` turns an absent key into null.
pub(crate) fn nullable_string(
    map: &Map<String, Value>,
    key: &str,
    default_missing: bool,
    errors: &mut ValidationErrors,
) -> Option<Option<String>> {
    let value = if default_missing {
        match map.get(key) {
            Some(value) => value,
            None => return Some(None),
        }
    } else {
        required(map, key, errors)?
    };
    match value {
        Value::Null => Some(None),
        Value::String(s) => Some(Some(s.clone())),
        other => {
            errors.push(key, format!("expected a string or null, got {}", kind(other)));
            None
        }
    }
}

pub(crate) fn boolean(
    map: &Map<String, Value>,
    key: &str,
    errors: &mut ValidationErrors,
) -> Option<bool> {
    match required(map, key, errors)? {
        Value::Bool(b) => Some(*b),
        other => {
            errors.push(key, format!("expected a boolean, got {}", kind(other)));
            None
        }
    }
}

/// Non-negative integer. No coercion: numeric text is a failure.
pub(crate) fn count(
    map: &Map<String, Value>,
    key: &str,
    errors: &mut ValidationErrors,
) -> Option<u64> {
    match required(map, key, errors)? {
        Value::Number(n) => match n.as_u64() {
            Some(v) => Some(v),
            None => {
                errors.push(key, format!("expected a non-negative integer, got {}", n));
                None
            }
        },
        other => {
            errors.push(
                key,
                format!("expected a non-negative integer, got {}", kind(other)),
            );
            None
        }
    }
}

pub(crate) fn engine_type(
    map: &Map<String, Value>,
    key: &str,
    errors: &mut ValidationErrors,
) -> Option<Option<EngineType>> {
    match required(map, key, errors)? {
        Value::Null => Some(None),
        Value::String(s) => match s.parse::<EngineType>() {
            Ok(engine) => Some(Some(engine)),
            Err(e) => {
                errors.push(key, e.reason);
                None
            }
        },
        other => {
            errors.push(
                key,
                format!("expected 'single', 'multi' or null, got {}", kind(other)),
            );
            None
        }
    }
}

/// Any shape is accepted at intake; the normalization step decides.
pub(crate) fn path(
    map: &Map<String, Value>,
    key: &str,
    errors: &mut ValidationErrors,
) -> Option<FilePath> {
    let raw = PathInput::new(required(map, key, errors)?.clone());
    match raw.normalize() {
        Ok(path) => Some(path),
        Err(e) => {
            errors.push(key, e.to_string());
            None
        }
    }
}

/// Report every key from `keys` that is present.
pub(crate) fn forbid(
    map: &Map<String, Value>,
    keys: &[&str],
    reason: &str,
    errors: &mut ValidationErrors,
) {
    for key in keys {
        if map.contains_key(*key) {
            errors.push(*key, reason);
        }
    }
}
