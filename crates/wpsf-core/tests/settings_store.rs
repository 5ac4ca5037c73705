// crates/wpsf-core/tests/settings_store.rs
// ============================================================================
// Module: Settings Store Tests
// Description: Effective value resolution, memoization, and persistence.
// Purpose: Validate defaults layering, lookups, and fail-closed writes.
// Dependencies: wpsf-core, serde_json
// ============================================================================
//! ## Overview
//! Exercises [`wpsf_core::SettingsStore`] over the in-memory option store and
//! a counting wrapper that observes how often the backend is read.
//!
//! Security posture: a rejected validation pass must not change stored data.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::cell::Cell;
use std::sync::Arc;

use serde_json::Value;
use serde_json::json;
use wpsf_core::InMemoryOptionStore;
use wpsf_core::KeyModeError;
use wpsf_core::OptionStore;
use wpsf_core::Schema;
use wpsf_core::SchemaSource;
use wpsf_core::SettingsError;
use wpsf_core::SettingsMap;
use wpsf_core::SettingsStore;
use wpsf_core::StoreError;
use wpsf_core::ValidationRejection;

type TestResult = Result<(), String>;

/// Option store wrapper that counts reads.
#[derive(Default)]
struct CountingStore {
    /// Wrapped store.
    inner: InMemoryOptionStore,
    /// Number of `get` calls.
    reads: Cell<usize>,
}

impl OptionStore for CountingStore {
    fn get(&self, name: &str) -> Result<Option<Value>, StoreError> {
        self.reads.set(self.reads.get() + 1);
        self.inner.get(name)
    }

    fn set(&self, name: &str, value: &Value) -> Result<(), StoreError> {
        self.inner.set(name, value)
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.inner.delete(name)
    }
}

/// Flat schema with one defaulted and one undefaulted field.
fn flat_schema() -> Arc<Schema> {
    let source: SchemaSource = serde_json::from_value(json!({
        "group_id": "my_plugin",
        "sections": [{
            "section_id": "general",
            "section_title": "General",
            "fields": [
                { "id": "name", "default": "Ada" },
                { "id": "count", "type": "number" },
                { "id": "colors", "type": "checkboxes", "default": { "a": "red", "b": "blue" } }
            ]
        }, {
            "section_id": "extra",
            "section_title": "Extra",
            "fields": [{ "id": "name", "default": "Grace" }]
        }]
    }))
    .expect("schema json");
    Arc::new(Schema::build(source).expect("schema"))
}

/// Tabbed schema with a single field.
fn tabbed_schema() -> Arc<Schema> {
    let source: SchemaSource = serde_json::from_value(json!({
        "group_id": "tabbed",
        "tabs": [{ "id": "main", "title": "Main" }],
        "sections": [{ "tab_id": "main", "section_id": "general", "section_title": "General",
                       "fields": [{ "id": "name" }] }]
    }))
    .expect("schema json");
    Arc::new(Schema::build(source).expect("schema"))
}

/// Builds a settings map from pairs.
fn settings(pairs: &[(&str, Value)]) -> SettingsMap {
    pairs.iter().map(|(key, value)| ((*key).to_string(), value.clone())).collect()
}

#[test]
fn unsaved_fields_fall_back_to_defaults_or_false() -> TestResult {
    let store = SettingsStore::new(flat_schema(), InMemoryOptionStore::new());
    let read = store.read(false).map_err(|err| err.to_string())?;
    let expected = settings(&[
        ("general_name", json!("Ada")),
        ("general_count", json!(false)),
        ("general_colors", json!(["red", "blue"])),
        ("extra_name", json!("Grace")),
    ]);
    if read != expected {
        return Err(format!("unexpected effective values {read:?}"));
    }
    Ok(())
}

#[test]
fn persisted_values_override_defaults_and_null_is_absent() -> TestResult {
    let options = InMemoryOptionStore::new();
    options
        .set("my_plugin_settings", &json!({ "general_name": "Linus", "general_count": null, "stale_key": 1 }))
        .map_err(|err| err.to_string())?;
    let store = SettingsStore::new(flat_schema(), options);
    let read = store.read(false).map_err(|err| err.to_string())?;
    if read.get("general_name") != Some(&json!("Linus")) {
        return Err("persisted value should win".to_string());
    }
    if read.get("general_count") != Some(&json!(false)) {
        return Err("null should count as absent".to_string());
    }
    if read.contains_key("stale_key") {
        return Err("effective view should only hold schema keys".to_string());
    }
    let persisted = store.persisted().map_err(|err| err.to_string())?;
    if persisted.get("stale_key") != Some(&json!(1)) {
        return Err("raw document should keep unknown keys".to_string());
    }
    Ok(())
}

#[test]
fn unprefixed_view_lets_later_fields_win() -> TestResult {
    let store = SettingsStore::new(flat_schema(), InMemoryOptionStore::new());
    let read = store.read(true).map_err(|err| err.to_string())?;
    if read.get("name") != Some(&json!("Grace")) {
        return Err(format!("expected the later section to win, got {:?}", read.get("name")));
    }
    if read.len() != 3 {
        return Err(format!("expected three unprefixed keys, got {}", read.len()));
    }
    Ok(())
}

#[test]
fn resolution_is_memoized_until_a_write() -> TestResult {
    let mut store = SettingsStore::new(flat_schema(), CountingStore::default());
    store.read(false).map_err(|err| err.to_string())?;
    store.read(true).map_err(|err| err.to_string())?;
    store.get_option("name", json!("fallback")).map_err(|err| err.to_string())?;
    if store.options().reads.get() != 1 {
        return Err(format!("expected one backend read, got {}", store.options().reads.get()));
    }
    store
        .validate_and_persist(settings(&[("general_name", json!("Bob"))]))
        .map_err(|err| err.to_string())?;
    let read = store.read(false).map_err(|err| err.to_string())?;
    if store.options().reads.get() != 2 {
        return Err("a write should drop the cache".to_string());
    }
    if read.get("general_name") != Some(&json!("Bob")) {
        return Err("write not visible after invalidation".to_string());
    }
    Ok(())
}

#[test]
fn get_setting_returns_raw_values_without_defaults() -> TestResult {
    let options = InMemoryOptionStore::new();
    options.set("my_plugin_settings", &json!({ "general_count": "7" })).map_err(|err| err.to_string())?;
    let store = SettingsStore::new(flat_schema(), options);
    let count = store.get_setting(None, "general", "count").map_err(|err| err.to_string())?;
    let name = store.get_setting(None, "general", "name").map_err(|err| err.to_string())?;
    if count != json!("7") || name != json!(false) {
        return Err(format!("unexpected raw values {count} / {name}"));
    }
    Ok(())
}

#[test]
fn get_setting_enforces_key_mode() {
    let flat = SettingsStore::new(flat_schema(), InMemoryOptionStore::new());
    assert_eq!(
        flat.get_setting(Some("main"), "general", "name"),
        Err(SettingsError::KeyModeMismatch(KeyModeError::UnexpectedTab("main".to_string())))
    );
    let tabbed = SettingsStore::new(tabbed_schema(), InMemoryOptionStore::new());
    assert_eq!(
        tabbed.get_setting(None, "general", "name"),
        Err(SettingsError::KeyModeMismatch(KeyModeError::MissingTab))
    );
    assert_eq!(tabbed.get_setting(Some("main"), "general", "name"), Ok(json!(false)));
}

#[test]
fn get_option_falls_back_on_empty_values() -> TestResult {
    let options = InMemoryOptionStore::new();
    options
        .set("my_plugin_settings", &json!({ "general_count": "0", "extra_name": "" }))
        .map_err(|err| err.to_string())?;
    let store = SettingsStore::new(flat_schema(), options);
    let count = store.get_option("count", json!(10)).map_err(|err| err.to_string())?;
    let name = store.get_option("name", json!("nobody")).map_err(|err| err.to_string())?;
    let missing = store.get_option("missing", json!("fallback")).map_err(|err| err.to_string())?;
    if count != json!(10) || name != json!("nobody") || missing != json!("fallback") {
        return Err(format!("unexpected fallbacks {count} / {name} / {missing}"));
    }
    Ok(())
}

#[test]
fn rejected_validation_leaves_store_unchanged() -> TestResult {
    let options = InMemoryOptionStore::new();
    options.set("my_plugin_settings", &json!({ "general_name": "Keep" })).map_err(|err| err.to_string())?;
    let mut store = SettingsStore::new(flat_schema(), options.clone())
        .with_validation_hook(|_input: SettingsMap| -> Result<SettingsMap, ValidationRejection> {
            Err(ValidationRejection::new("name_required"))
        });
    let result = store.validate_and_persist(settings(&[("general_name", json!("Drop"))]));
    if result != Err(SettingsError::ValidationFailed("name_required".to_string())) {
        return Err(format!("unexpected result {result:?}"));
    }
    let stored = options.get("my_plugin_settings").map_err(|err| err.to_string())?;
    if stored != Some(json!({ "general_name": "Keep" })) {
        return Err("document changed after rejection".to_string());
    }
    Ok(())
}

#[test]
fn validation_hook_can_transform_input() -> TestResult {
    let mut store = SettingsStore::new(flat_schema(), InMemoryOptionStore::new()).with_validation_hook(
        |mut input: SettingsMap| -> Result<SettingsMap, ValidationRejection> {
            input.insert("general_count".to_string(), json!("42"));
            Ok(input)
        },
    );
    let saved = store.validate_and_persist(SettingsMap::new()).map_err(|err| err.to_string())?;
    if saved.get("general_count") != Some(&json!("42")) {
        return Err("hook output should be persisted".to_string());
    }
    if store.get_option("count", Value::Null).map_err(|err| err.to_string())? != json!("42") {
        return Err("persisted value not readable".to_string());
    }
    Ok(())
}

#[test]
fn non_object_records_read_as_empty_and_delete_clears() -> TestResult {
    let options = InMemoryOptionStore::new();
    options.set("my_plugin_settings", &json!("garbage")).map_err(|err| err.to_string())?;
    let mut store = SettingsStore::new(flat_schema(), options.clone());
    if !store.persisted().map_err(|err| err.to_string())?.is_empty() {
        return Err("non-object record should read as empty".to_string());
    }
    store.delete_all().map_err(|err| err.to_string())?;
    if options.get("my_plugin_settings").map_err(|err| err.to_string())?.is_some() {
        return Err("record should be deleted".to_string());
    }
    Ok(())
}

#[test]
fn object_defaults_keep_declaration_order() -> TestResult {
    let source: SchemaSource = serde_json::from_value(json!({
        "group_id": "ordered",
        "sections": [{
            "section_id": "sec",
            "section_title": "Section",
            "fields": [{ "id": "m", "type": "multiinputs", "default": { "Zeta": "z", "Alpha": "a" } }]
        }]
    }))
    .map_err(|err| err.to_string())?;
    let schema = Arc::new(Schema::build(source).map_err(|err| err.to_string())?);
    let store = SettingsStore::new(schema, InMemoryOptionStore::new());
    let effective = store.read(false).map_err(|err| err.to_string())?;
    if effective.get("sec_m") != Some(&json!(["z", "a"])) {
        return Err(format!("object default lost its order: {:?}", effective.get("sec_m")));
    }
    Ok(())
}
