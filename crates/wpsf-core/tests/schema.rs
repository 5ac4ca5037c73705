// crates/wpsf-core/tests/schema.rs
// ============================================================================
// Module: Schema Build Tests
// Description: Validation, section ordering, and key derivation at build time.
// Purpose: Ensure malformed schemas are rejected and valid ones are normalized.
// Dependencies: wpsf-core, proptest, serde_json
// ============================================================================
//! ## Overview
//! Builds schemas from JSON sources and checks the structural invariants:
//! group id presence, tab references, scoped id uniqueness, key collisions,
//! and the stable section sort.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use proptest::prelude::*;
use serde_json::Value;
use serde_json::json;
use wpsf_core::ChoiceLabel;
use wpsf_core::KeyMode;
use wpsf_core::Schema;
use wpsf_core::SchemaError;
use wpsf_core::SchemaSource;
use wpsf_core::Section;
use wpsf_core::core::schema::sort_sections;

type TestResult = Result<(), String>;

/// Builds a schema from a JSON value.
fn build(source: Value) -> Result<Schema, SchemaError> {
    let source: SchemaSource = serde_json::from_value(source).expect("schema source json");
    Schema::build(source)
}

/// Returns a section with an optional explicit order.
fn section(id: &str, order: Option<i64>) -> Section {
    let mut value = json!({ "section_id": id, "section_title": id.to_uppercase(), "fields": [] });
    if let Some(order) = order {
        value["section_order"] = json!(order);
    }
    serde_json::from_value(value).expect("section json")
}

#[test]
fn flat_schema_derives_section_field_keys() -> TestResult {
    let schema = build(json!({
        "group_id": "my_plugin",
        "sections": [{
            "section_id": "general",
            "section_title": "General",
            "fields": [{ "id": "name", "title": "Name" }, { "id": "count", "type": "number" }]
        }]
    }))
    .map_err(|err| err.to_string())?;

    let keys: Vec<&str> = schema.field_entries().map(|entry| entry.key.as_str()).collect();
    if keys != ["general_name", "general_count"] {
        return Err(format!("unexpected keys {keys:?}"));
    }
    if schema.key_mode() != KeyMode::Flat {
        return Err("expected flat key mode".to_string());
    }
    let first = schema.field_entries().next().ok_or("missing field")?;
    if first.field.field_type != "text" {
        return Err(format!("default field type should be text, got {}", first.field.field_type));
    }
    Ok(())
}

#[test]
fn tabbed_schema_prefixes_keys_with_tab() -> TestResult {
    let schema = build(json!({
        "group_id": "my_plugin",
        "tabs": [{ "id": "tab1", "title": "One" }, { "id": "tab2", "title": "Two" }],
        "sections": [
            { "tab_id": "tab1", "section_id": "general", "section_title": "General",
              "fields": [{ "id": "name" }] },
            { "tab_id": "tab2", "section_id": "general", "section_title": "General",
              "fields": [{ "id": "name" }] }
        ]
    }))
    .map_err(|err| err.to_string())?;

    let keys: Vec<&str> = schema.field_entries().map(|entry| entry.key.as_str()).collect();
    if keys != ["tab1_general_name", "tab2_general_name"] {
        return Err(format!("unexpected keys {keys:?}"));
    }
    if schema.key_mode() != KeyMode::Tabbed {
        return Err("expected tabbed key mode".to_string());
    }
    if schema.sections_for_tab("tab2").count() != 1 {
        return Err("tab2 should own one section".to_string());
    }
    Ok(())
}

#[test]
fn missing_group_id_is_rejected() {
    let result = build(json!({ "group_id": "  ", "sections": [] }));
    assert_eq!(result, Err(SchemaError::MissingGroupId));
    let result = build(json!({ "sections": [] }));
    assert_eq!(result, Err(SchemaError::MissingGroupId));
}

#[test]
fn section_without_title_is_rejected() {
    let result = build(json!({
        "group_id": "g",
        "sections": [{ "section_id": "a", "section_title": "A" }, { "section_id": "b" }]
    }));
    assert_eq!(result, Err(SchemaError::InvalidSection { index: 1 }));
}

#[test]
fn section_referencing_unknown_tab_is_rejected() {
    let result = build(json!({
        "group_id": "g",
        "tabs": [{ "id": "tab1", "title": "One" }],
        "sections": [{ "tab_id": "missing", "section_id": "a", "section_title": "A" }]
    }));
    assert_eq!(
        result,
        Err(SchemaError::UnknownTab { section_id: "a".to_string(), tab_id: "missing".to_string() })
    );
}

#[test]
fn section_without_tab_in_tabbed_schema_is_rejected() {
    let result = build(json!({
        "group_id": "g",
        "tabs": [{ "id": "tab1", "title": "One" }],
        "sections": [{ "section_id": "a", "section_title": "A" }]
    }));
    assert_eq!(result, Err(SchemaError::UnknownTab { section_id: "a".to_string(), tab_id: String::new() }));
}

#[test]
fn duplicate_ids_are_rejected_per_scope() {
    let tabs = build(json!({
        "group_id": "g",
        "tabs": [{ "id": "t", "title": "T" }, { "id": "t", "title": "Again" }],
        "sections": []
    }));
    assert_eq!(tabs, Err(SchemaError::DuplicateId { kind: "tab", id: "t".to_string() }));

    let fields = build(json!({
        "group_id": "g",
        "sections": [{ "section_id": "s", "section_title": "S", "fields": [{ "id": "f" }, { "id": "f" }] }]
    }));
    assert_eq!(fields, Err(SchemaError::DuplicateId { kind: "field", id: "f".to_string() }));

    let subfields = build(json!({
        "group_id": "g",
        "sections": [{ "section_id": "s", "section_title": "S", "fields": [
            { "id": "rows", "type": "group", "subfields": [{ "id": "x" }, { "id": "x" }] }
        ] }]
    }));
    assert_eq!(subfields, Err(SchemaError::DuplicateId { kind: "subfield", id: "x".to_string() }));
}

#[test]
fn field_without_id_is_rejected() {
    let result = build(json!({
        "group_id": "g",
        "sections": [{ "section_id": "s", "section_title": "S", "fields": [{ "id": "a" }, { "title": "No id" }] }]
    }));
    assert_eq!(result, Err(SchemaError::InvalidField { section_id: "s".to_string(), index: 1 }));
}

#[test]
fn underscore_ids_that_collide_are_rejected() {
    let result = build(json!({
        "group_id": "g",
        "sections": [
            { "section_id": "a_b", "section_title": "AB", "fields": [{ "id": "c" }] },
            { "section_id": "a", "section_title": "A", "fields": [{ "id": "b_c" }] }
        ]
    }));
    assert_eq!(result, Err(SchemaError::KeyCollision { key: "a_b_c".to_string() }));
}

#[test]
fn sections_sort_by_order_with_inherited_ties() {
    let sorted = sort_sections(vec![section("a", Some(10)), section("b", Some(5)), section("c", None)]);
    let ids: Vec<&str> = sorted.iter().map(Section::id).collect();
    assert_eq!(ids, ["b", "c", "a"]);
}

#[test]
fn leading_unordered_sections_sort_first() {
    let sorted = sort_sections(vec![section("x", None), section("y", Some(-1)), section("z", Some(3))]);
    let ids: Vec<&str> = sorted.iter().map(Section::id).collect();
    assert_eq!(ids, ["y", "x", "z"]);
}

#[test]
fn choices_keep_declaration_order() -> TestResult {
    let source: SchemaSource = serde_json::from_str(
        r#"{
            "group_id": "g",
            "sections": [{
                "section_id": "s",
                "section_title": "S",
                "fields": [{
                    "id": "pick",
                    "type": "select",
                    "choices": { "zeta": "Zeta", "alpha": "Alpha", "fruit": { "pear": "Pear" } }
                }, {
                    "id": "layout",
                    "type": "image_radio",
                    "choices": { "left": { "text": "Left", "image": "left.png" } }
                }, {
                    "id": "list",
                    "type": "radio",
                    "std": "1",
                    "choices": ["No", "Yes"]
                }]
            }]
        }"#,
    )
    .map_err(|err| err.to_string())?;
    let schema = Schema::build(source).map_err(|err| err.to_string())?;
    let fields: Vec<_> = schema.field_entries().map(|entry| entry.field).collect();

    let order: Vec<&str> = fields[0].choices.iter().map(|(value, _)| value).collect();
    if order != ["zeta", "alpha", "fruit"] {
        return Err(format!("choice order not preserved: {order:?}"));
    }
    if !matches!(fields[0].choices.iter().nth(2), Some((_, ChoiceLabel::Group(_)))) {
        return Err("nested choices should form an option group".to_string());
    }
    let image = fields[1].choices.iter().next().and_then(|(_, label)| label.image());
    if image != Some("left.png") {
        return Err(format!("unexpected image label {image:?}"));
    }
    let list: Vec<&str> = fields[2].choices.iter().map(|(value, _)| value).collect();
    if list != ["0", "1"] || fields[2].default != Some(json!("1")) {
        return Err("list choices should use indexes and std should alias default".to_string());
    }
    Ok(())
}

#[test]
fn unknown_field_keys_are_kept_as_options() -> TestResult {
    let schema = build(json!({
        "group_id": "g",
        "sections": [{ "section_id": "s", "section_title": "S", "fields": [
            { "id": "pick", "type": "select", "multiple": true, "mimetype": "css" }
        ] }]
    }))
    .map_err(|err| err.to_string())?;
    let field = schema.field_entries().next().ok_or("missing field")?.field;
    if !field.option_flag("multiple") || field.option_str("mimetype") != Some("css") {
        return Err("type-specific options were not retained".to_string());
    }
    Ok(())
}

proptest! {
    #[test]
    fn section_sort_is_stable_and_ordered(orders in proptest::collection::vec(proptest::option::of(-5_i64..5), 0..12)) {
        let sections: Vec<Section> = orders
            .iter()
            .enumerate()
            .map(|(index, order)| section(&format!("s{index}"), *order))
            .collect();
        let mut previous = 0_i64;
        let effective: Vec<i64> = orders
            .iter()
            .map(|order| {
                let value = order.unwrap_or(previous);
                previous = value;
                value
            })
            .collect();

        let sorted = sort_sections(sections);
        let positions: Vec<usize> = sorted
            .iter()
            .map(|section| section.id()[1..].parse::<usize>().expect("index suffix"))
            .collect();
        for pair in positions.windows(2) {
            let (left, right) = (pair[0], pair[1]);
            prop_assert!(effective[left] <= effective[right]);
            if effective[left] == effective[right] {
                prop_assert!(left < right);
            }
        }
        prop_assert_eq!(positions.len(), orders.len());
    }
}
