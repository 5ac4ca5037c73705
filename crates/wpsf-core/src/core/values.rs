// crates/wpsf-core/src/core/values.rs
// ============================================================================
// Module: WPSF Setting Values
// Description: Settings maps and value helpers shared by store and renderers.
// Purpose: Keep emptiness, default normalization, and display text consistent.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Setting values are arbitrary JSON. A [`SettingsMap`] maps setting keys (or
//! bare field ids in the unprefixed view) to values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Settings keyed by derived key (or bare field id in the unprefixed view).
pub type SettingsMap = BTreeMap<String, Value>;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true for values treated as empty: null, `false`, `0`, `""`,
/// `"0"`, and empty arrays or objects.
#[must_use]
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n == 0.0),
        Value::String(text) => text.is_empty() || text == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(entries) => entries.is_empty(),
    }
}

/// Normalizes a declared default: objects become arrays of their values.
#[must_use]
pub fn normalize_default(value: Value) -> Value {
    match value {
        Value::Object(entries) => Value::Array(entries.into_iter().map(|(_, item)| item).collect()),
        other => other,
    }
}

/// Converts a JSON object into a settings map; other values yield `None`.
#[must_use]
pub fn settings_from_value(value: Value) -> Option<SettingsMap> {
    match value {
        Value::Object(entries) => Some(entries.into_iter().collect()),
        _ => None,
    }
}

/// Converts a settings map into a JSON object value.
#[must_use]
pub fn settings_to_value(settings: &SettingsMap) -> Value {
    Value::Object(settings.iter().map(|(key, value)| (key.clone(), value.clone())).collect())
}

/// Returns the text a scalar value renders as.
///
/// `true` renders as `1`; null, `false`, arrays, and objects render empty.
#[must_use]
pub fn display_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) | Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}
