// crates/wpsf-config/tests/load_validation.rs
// ============================================================================
// Module: Config Load Validation Tests
// Description: Loading, limits, and cross-field checks for wpsf.toml.
// Purpose: Ensure configuration and schema files fail closed.
// Dependencies: wpsf-config, wpsf-store-sqlite, tempfile
// ============================================================================

//! ## Overview
//! Writes config and schema fixtures into temporary directories and loads
//! them through the public entry points.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use tempfile::TempDir;
use wpsf_config::ConfigError;
use wpsf_config::StorageBackend;
use wpsf_config::WpsfConfig;
use wpsf_config::load_schema_source;
use wpsf_store_sqlite::SqliteStoreMode;

type TestResult = Result<(), String>;

/// Minimal JSON schema with an embedded group id.
const SCHEMA_JSON: &str = r#"{
    "group_id": "my_plugin",
    "sections": [{
        "section_id": "general",
        "section_title": "General",
        "fields": [{ "id": "name", "default": "Ada" }]
    }]
}"#;

/// Writes `content` to `dir/name` and returns the path.
fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("write fixture");
    path
}

/// Asserts that `result` failed with a message containing `needle`.
fn assert_error<T>(result: Result<T, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err(format!("expected an error containing {needle}")),
    }
}

#[test]
fn minimal_config_applies_defaults() -> TestResult {
    let temp = TempDir::new().map_err(|err| err.to_string())?;
    let path = write_file(temp.path(), "wpsf.toml", "[settings]\nschema_path = \"schema.json\"\n");
    let config = WpsfConfig::load(Some(&path)).map_err(|err| err.to_string())?;
    if config.storage.backend != StorageBackend::Memory {
        return Err("memory backend should be the default".to_string());
    }
    if !config.audit.enabled || config.audit_path().is_some() {
        return Err("audit should default to enabled on stderr".to_string());
    }
    if config.render.ajax_url != "admin-ajax.php" {
        return Err(format!("unexpected ajax url {}", config.render.ajax_url));
    }
    let options = config.render.render_options();
    if !options.show_save_button || !options.show_tab_links {
        return Err("render flags should default on".to_string());
    }
    if config.tokens.ttl_secs != 3600 {
        return Err(format!("unexpected ttl {}", config.tokens.ttl_secs));
    }
    if config.schema_path() != temp.path().join("schema.json") {
        return Err("schema path should resolve next to the config".to_string());
    }
    Ok(())
}

#[test]
fn sqlite_backend_requires_table_and_resolves_path() -> TestResult {
    let temp = TempDir::new().map_err(|err| err.to_string())?;
    let missing = write_file(
        temp.path(),
        "missing.toml",
        "[settings]\nschema_path = \"s.json\"\n[storage]\nbackend = \"sqlite\"\n",
    );
    assert_error(WpsfConfig::load(Some(&missing)), "storage.sqlite must be set")?;

    let present = write_file(
        temp.path(),
        "present.toml",
        "[settings]\nschema_path = \"s.json\"\n[storage]\nbackend = \"sqlite\"\n\
         [storage.sqlite]\npath = \"data/options.sqlite\"\njournal_mode = \"delete\"\n",
    );
    let config = WpsfConfig::load(Some(&present)).map_err(|err| err.to_string())?;
    let sqlite = config.sqlite_store_config().ok_or("sqlite config missing")?;
    if sqlite.path != temp.path().join("data/options.sqlite") {
        return Err(format!("unexpected sqlite path {}", sqlite.path.display()));
    }
    if sqlite.journal_mode != SqliteStoreMode::Delete || sqlite.busy_timeout_ms != 5_000 {
        return Err("sqlite tuning not applied".to_string());
    }
    Ok(())
}

#[test]
fn invalid_sections_are_rejected() -> TestResult {
    let temp = TempDir::new().map_err(|err| err.to_string())?;
    let ttl = write_file(
        temp.path(),
        "ttl.toml",
        "[settings]\nschema_path = \"s.json\"\n[tokens]\nttl_secs = 0\n",
    );
    assert_error(WpsfConfig::load(Some(&ttl)), "tokens.ttl_secs")?;

    let group = write_file(
        temp.path(),
        "group.toml",
        "[settings]\nschema_path = \"s.json\"\ngroup_id = \" padded\"\n",
    );
    assert_error(WpsfConfig::load(Some(&group)), "settings.group_id must be trimmed")?;

    let audit = write_file(
        temp.path(),
        "audit.toml",
        "[settings]\nschema_path = \"s.json\"\n[audit]\npath = \"  \"\n",
    );
    assert_error(WpsfConfig::load(Some(&audit)), "audit.path must be non-empty")?;

    let ajax = write_file(
        temp.path(),
        "ajax.toml",
        "[settings]\nschema_path = \"s.json\"\n[render]\najax_url = \"\"\n",
    );
    assert_error(WpsfConfig::load(Some(&ajax)), "render.ajax_url must be non-empty")?;

    let missing_settings = write_file(temp.path(), "empty.toml", "");
    assert_error(WpsfConfig::load(Some(&missing_settings)), "config parse error")?;
    Ok(())
}

#[test]
fn oversized_and_non_utf8_files_fail_closed() -> TestResult {
    let temp = TempDir::new().map_err(|err| err.to_string())?;
    let big = temp.path().join("big.toml");
    fs::write(&big, vec![b'#'; 1024 * 1024 + 1]).map_err(|err| err.to_string())?;
    assert_error(WpsfConfig::load(Some(&big)), "config file exceeds size limit")?;

    let binary = temp.path().join("binary.toml");
    fs::write(&binary, [0xff_u8, 0xfe, 0x00]).map_err(|err| err.to_string())?;
    assert_error(WpsfConfig::load(Some(&binary)), "config file must be utf-8")?;

    assert_error(WpsfConfig::load(Some(&temp.path().join("absent.toml"))), "config io error")?;
    Ok(())
}

#[test]
fn schema_loads_from_json_and_toml() -> TestResult {
    let temp = TempDir::new().map_err(|err| err.to_string())?;
    let json_path = write_file(temp.path(), "schema.json", SCHEMA_JSON);
    let source = load_schema_source(&json_path).map_err(|err| err.to_string())?;
    if source.group_id.as_deref() != Some("my_plugin") || source.sections.len() != 1 {
        return Err("json schema not parsed".to_string());
    }

    let toml_path = write_file(
        temp.path(),
        "schema.toml",
        "group_id = \"my_plugin\"\n\n[[sections]]\nsection_id = \"general\"\n\
         section_title = \"General\"\n\n[[sections.fields]]\nid = \"name\"\ntype = \"text\"\n",
    );
    let source = load_schema_source(&toml_path).map_err(|err| err.to_string())?;
    if source.sections.len() != 1 || source.sections[0].fields.len() != 1 {
        return Err("toml schema not parsed".to_string());
    }

    let yaml = write_file(temp.path(), "schema.yaml", "group_id: x\n");
    assert_error(load_schema_source(&yaml), "must end in .json or .toml")?;
    Ok(())
}

#[test]
fn config_group_id_fills_or_must_match_schema() -> TestResult {
    let temp = TempDir::new().map_err(|err| err.to_string())?;
    write_file(temp.path(), "schema.json", SCHEMA_JSON);
    write_file(
        temp.path(),
        "anonymous.json",
        r#"{ "sections": [{ "section_id": "s", "section_title": "S", "fields": [{ "id": "f" }] }] }"#,
    );

    let matching = write_file(
        temp.path(),
        "matching.toml",
        "[settings]\nschema_path = \"schema.json\"\ngroup_id = \"my_plugin\"\n",
    );
    let schema = WpsfConfig::load(Some(&matching))
        .and_then(|config| config.load_schema())
        .map_err(|err| err.to_string())?;
    if schema.group_id().as_str() != "my_plugin" {
        return Err("schema group id changed".to_string());
    }

    let filled = write_file(
        temp.path(),
        "filled.toml",
        "[settings]\nschema_path = \"anonymous.json\"\ngroup_id = \"from_config\"\n",
    );
    let schema = WpsfConfig::load(Some(&filled))
        .and_then(|config| config.load_schema())
        .map_err(|err| err.to_string())?;
    if schema.group_id().as_str() != "from_config" {
        return Err("config group id should fill the schema".to_string());
    }

    let conflicting = write_file(
        temp.path(),
        "conflict.toml",
        "[settings]\nschema_path = \"schema.json\"\ngroup_id = \"other\"\n",
    );
    let config = WpsfConfig::load(Some(&conflicting)).map_err(|err| err.to_string())?;
    assert_error(config.load_schema(), "does not match schema group_id")?;

    let unnamed = write_file(temp.path(), "unnamed.toml", "[settings]\nschema_path = \"anonymous.json\"\n");
    let config = WpsfConfig::load(Some(&unnamed)).map_err(|err| err.to_string())?;
    assert_error(config.load_schema(), "schema:")?;
    Ok(())
}

#[test]
fn toml_schema_keeps_choice_and_default_order() -> TestResult {
    let temp = TempDir::new().map_err(|err| err.to_string())?;
    let path = write_file(
        temp.path(),
        "schema.toml",
        "group_id = \"my_plugin\"\n\n[[sections]]\nsection_id = \"general\"\nsection_title = \"General\"\n\n\
         [[sections.fields]]\nid = \"pick\"\ntype = \"select\"\n\n[sections.fields.choices]\n\
         zeta = \"Zeta\"\nalpha = \"Alpha\"\nmid = \"Mid\"\n\n[sections.fields.default]\n\
         Zeta = \"z\"\nAlpha = \"a\"\n",
    );
    let source = load_schema_source(&path).map_err(|err| err.to_string())?;
    let field = source
        .sections
        .first()
        .and_then(|section| section.fields.first())
        .ok_or("field missing")?;
    let keys: Vec<&str> = field.choices.iter().map(|(key, _)| key).collect();
    if keys != ["zeta", "alpha", "mid"] {
        return Err(format!("toml choices reordered: {keys:?}"));
    }
    let default_keys: Vec<&String> = field
        .default
        .as_ref()
        .and_then(serde_json::Value::as_object)
        .map(|entries| entries.keys().collect())
        .unwrap_or_default();
    if default_keys != ["Zeta", "Alpha"] {
        return Err(format!("toml default reordered: {default_keys:?}"));
    }
    Ok(())
}
