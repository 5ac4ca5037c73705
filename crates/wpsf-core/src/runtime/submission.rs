// crates/wpsf-core/src/runtime/submission.rs
// ============================================================================
// Module: WPSF Form Submission Decoding
// Description: Decodes bracketed form input names into a settings mapping.
// Purpose: Turn posted (name, value) pairs into the raw submitted mapping.
// Dependencies: crate::core, serde_json
// ============================================================================

//! ## Overview
//! Inputs are named `{group}_settings[key]`, optionally followed by more
//! bracketed segments: `[]` appends to a list, `[0][sub]` addresses a group
//! row. Pairs apply in order, so a later scalar overwrites an earlier one
//! (the hidden `0` before a checked checkbox yields `1`).
//!
//! Objects whose keys are exactly `0..n` become arrays; objects with gaps
//! stay objects and keep their numeric keys. Pairs addressed to other
//! groups, and names that are not well-formed, are ignored.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;

use crate::core::GroupId;
use crate::core::SettingsMap;
use crate::core::option_name;

// ============================================================================
// SECTION: Name Parsing
// ============================================================================

/// One bracketed segment of an input name.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// `[key]`
    Key(String),
    /// `[]`
    Append,
}

/// Splits `[a][b][]` into segments; `None` when malformed.
fn parse_segments(mut rest: &str) -> Option<Vec<Segment>> {
    let mut segments = Vec::new();
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        let segment = &inner[..close];
        if segment.contains('[') {
            return None;
        }
        segments.push(if segment.is_empty() { Segment::Append } else { Segment::Key(segment.to_string()) });
        rest = &inner[close + 1..];
    }
    Some(segments)
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Decodes posted form pairs for one group into a settings mapping.
#[must_use]
pub fn decode_submission<I, K, V>(group_id: &GroupId, pairs: I) -> SettingsMap
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let prefix = option_name(group_id);
    let mut root = Map::new();
    for (name, value) in pairs {
        let Some(rest) = name.as_ref().strip_prefix(prefix.as_str()) else {
            continue;
        };
        let Some(segments) = parse_segments(rest) else {
            continue;
        };
        let Some((Segment::Key(first), tail)) = segments.split_first() else {
            continue;
        };
        insert_path(&mut root, first, tail, Value::String(value.into()));
    }
    root.into_iter().map(|(key, value)| (key, normalize_lists(value))).collect()
}

/// Inserts a value under `key` following the remaining segments.
fn insert_path(map: &mut Map<String, Value>, key: &str, tail: &[Segment], value: Value) {
    match tail.split_first() {
        None => {
            map.insert(key.to_string(), value);
        }
        Some((next, rest)) => {
            let slot = map.entry(key.to_string()).or_insert(Value::Null);
            insert_child(slot, next, rest, value);
        }
    }
}

/// Descends into `slot` for one segment, coercing it to the needed container.
fn insert_child(slot: &mut Value, segment: &Segment, tail: &[Segment], value: Value) {
    match segment {
        Segment::Key(key) => {
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(map) = slot {
                insert_path(map, key, tail, value);
            }
        }
        Segment::Append => {
            if !slot.is_array() {
                *slot = Value::Array(Vec::new());
            }
            if let Value::Array(items) = slot {
                match tail.split_first() {
                    None => items.push(value),
                    Some((next, rest)) => {
                        let mut child = Value::Null;
                        insert_child(&mut child, next, rest, value);
                        items.push(child);
                    }
                }
            }
        }
    }
}

/// Converts objects keyed exactly `0..n` into arrays, recursively.
fn normalize_lists(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let is_list = !map.is_empty()
                && (0..map.len()).all(|index| map.contains_key(index.to_string().as_str()));
            if is_list {
                let mut map = map;
                let items = (0..map.len())
                    .filter_map(|index| map.remove(index.to_string().as_str()))
                    .map(normalize_lists)
                    .collect();
                Value::Array(items)
            } else {
                Value::Object(map.into_iter().map(|(key, item)| (key, normalize_lists(item))).collect())
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_lists).collect()),
        other => other,
    }
}
