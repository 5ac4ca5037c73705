// crates/wpsf-core/tests/visibility.rs
// ============================================================================
// Module: Visibility Rule Tests
// Description: Compilation, evaluation, and encoding of show_if/hide_if rules.
// Purpose: Ensure visibility expressions evaluate as declared.
// Dependencies: wpsf-core, serde_json
// ============================================================================
//! ## Overview
//! Compiles field condition lists into expression trees and evaluates them
//! against value maps. Also checks the class encoding, the canonical JSON
//! form, and the depth guard on client-supplied trees.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use serde_json::Value;
use serde_json::json;
use wpsf_core::Field;
use wpsf_core::SettingsMap;
use wpsf_core::VisibilityError;
use wpsf_core::VisibilityExpr;
use wpsf_core::VisibilityValidator;
use wpsf_core::compile;
use wpsf_core::visibility_classes;

/// Parses a field definition.
fn field(value: Value) -> Field {
    serde_json::from_value(value).expect("field json")
}

/// Builds a value map from pairs.
fn values(pairs: &[(&str, Value)]) -> SettingsMap {
    pairs.iter().map(|(key, value)| ((*key).to_string(), value.clone())).collect()
}

#[test]
fn show_if_matches_listed_value() {
    let expr = compile(&field(json!({
        "id": "extra",
        "show_if": [{ "field": "mode", "value": ["advanced"] }]
    })));
    assert!(expr.eval(&values(&[("mode", json!("advanced"))])));
    assert!(!expr.eval(&values(&[("mode", json!("basic"))])));
    assert!(!expr.eval(&values(&[])));
}

#[test]
fn hide_if_alone_hides_only_on_match() {
    let expr = compile(&field(json!({
        "id": "extra",
        "hide_if": [{ "field": "disabled", "value": ["1"] }]
    })));
    assert!(expr.eval(&values(&[("disabled", json!("0"))])));
    assert!(expr.eval(&values(&[])));
    assert!(!expr.eval(&values(&[("disabled", json!("1"))])));
    assert!(!expr.eval(&values(&[("disabled", json!(true))])));
}

#[test]
fn clause_values_are_or_and_sequences_are_and() {
    let expr = compile(&field(json!({
        "id": "extra",
        "show_if": [[
            { "field": "mode", "value": ["a", "b"] },
            { "field": "level", "value": ["2"] }
        ]]
    })));
    assert!(expr.eval(&values(&[("mode", json!("b")), ("level", json!(2))])));
    assert!(!expr.eval(&values(&[("mode", json!("b")), ("level", json!(3))])));
    assert!(!expr.eval(&values(&[("mode", json!("c")), ("level", json!(2))])));
}

#[test]
fn list_entries_combine_with_or() {
    let expr = compile(&field(json!({
        "id": "extra",
        "show_if": [
            { "field": "mode", "value": "a" },
            { "field": "other", "value": ["x"] }
        ]
    })));
    assert!(expr.eval(&values(&[("mode", json!("a"))])));
    assert!(expr.eval(&values(&[("other", json!("x"))])));
    assert!(!expr.eval(&values(&[("mode", json!("z"))])));
}

#[test]
fn show_and_hide_combine() {
    let expr = compile(&field(json!({
        "id": "extra",
        "show_if": [{ "field": "mode", "value": ["on"] }],
        "hide_if": [{ "field": "lock", "value": ["1"] }]
    })));
    assert!(expr.eval(&values(&[("mode", json!("on")), ("lock", json!("0"))])));
    assert!(!expr.eval(&values(&[("mode", json!("on")), ("lock", json!("1"))])));
    assert!(!expr.eval(&values(&[("mode", json!("off")), ("lock", json!("0"))])));
}

#[test]
fn empty_value_lists_impose_no_constraint() {
    let expr = compile(&field(json!({
        "id": "extra",
        "show_if": [[{ "field": "mode", "value": [] }, { "field": "level", "value": ["1"] }]]
    })));
    assert!(expr.eval(&values(&[("level", json!("1"))])));

    let unconstrained = compile(&field(json!({
        "id": "extra",
        "show_if": [{ "field": "mode", "value": [] }]
    })));
    assert!(unconstrained.is_trivially_satisfied());
}

#[test]
fn unconditional_fields_are_always_visible() {
    let expr = compile(&field(json!({ "id": "plain" })));
    assert!(expr.is_trivially_satisfied());
    assert!(!expr.is_trivially_unsatisfiable());
    assert_eq!(visibility_classes(&field(json!({ "id": "plain" }))), "");
}

#[test]
fn array_values_match_any_element() {
    let expr = compile(&field(json!({
        "id": "extra",
        "show_if": [{ "field": "features", "value": ["beta"] }]
    })));
    assert!(expr.eval(&values(&[("features", json!(["alpha", "beta"]))])));
    assert!(!expr.eval(&values(&[("features", json!(["alpha"]))])));
}

#[test]
fn class_encoding_mirrors_conditions() {
    let element = field(json!({
        "id": "extra",
        "show_if": [
            { "field": "mode", "value": ["a", "b"] },
            [{ "field": "x", "value": ["1"] }, { "field": "y", "value": ["2"] }]
        ],
        "hide_if": [{ "field": "lock", "value": ["1"] }]
    }));
    assert_eq!(
        visibility_classes(&element),
        " show-if show-if--mode===a||b show-if--x===1&&y===2 hide-if hide-if--lock===1"
    );
}

#[test]
fn canonical_json_round_trips() -> Result<(), String> {
    let expr = compile(&field(json!({
        "id": "extra",
        "show_if": [{ "field": "mode", "value": ["advanced"] }]
    })));
    let encoded = expr.to_json().map_err(|err| err.to_string())?;
    if !encoded.starts_with(r#"{"and":"#) {
        return Err(format!("unexpected encoding {encoded}"));
    }
    let decoded = VisibilityValidator::default().parse_json(&encoded).map_err(|err| err.to_string())?;
    if decoded != expr {
        return Err("decoded expression differs".to_string());
    }
    Ok(())
}

#[test]
fn validator_rejects_deep_trees() {
    let mut expr = VisibilityExpr::matches("mode", ["a".to_string()]);
    for _ in 0..8 {
        expr = !expr;
    }
    let validator = VisibilityValidator::new(4);
    assert_eq!(validator.validate(&expr), Err(VisibilityError::TooDeep { max_depth: 4, actual_depth: 9 }));
    assert!(VisibilityValidator::default().validate(&expr).is_ok());
    assert!(matches!(validator.parse_json("{\"bogus\":1}"), Err(VisibilityError::Parse(_))));
}
