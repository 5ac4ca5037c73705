// crates/wpsf-core/tests/keys.rs
// ============================================================================
// Module: Key Derivation Tests
// Description: Storage key, input name, and key mode checks.
// Purpose: Ensure keys and form names are derived deterministically.
// Dependencies: wpsf-core, proptest
// ============================================================================
//! ## Overview
//! Covers derived keys in both modes, the key-mode guard on lookups, the
//! persisted record name, and nested group row names.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::BTreeSet;

use proptest::prelude::*;
use wpsf_core::GroupId;
use wpsf_core::KeyMode;
use wpsf_core::KeyModeError;
use wpsf_core::derive_key;
use wpsf_core::field_name;
use wpsf_core::group_row_id;
use wpsf_core::group_row_name;
use wpsf_core::option_name;

#[test]
fn keys_join_ids_with_underscores() {
    assert_eq!(derive_key(None, "general", "name").as_str(), "general_name");
    assert_eq!(derive_key(Some("tab1"), "general", "name").as_str(), "tab1_general_name");
}

#[test]
fn record_and_input_names_follow_group() {
    let group = GroupId::new("my_plugin");
    assert_eq!(option_name(&group), "my_plugin_settings");
    assert_eq!(field_name(&group, "general_name"), "my_plugin_settings[general_name]");
}

#[test]
fn group_rows_nest_ids_and_names() {
    let name = field_name(&GroupId::new("g"), "s_rows");
    assert_eq!(group_row_id("s_rows", 2, "label"), "s_rows_2_label");
    assert_eq!(group_row_name(&name, 2, "label"), "g_settings[s_rows][2][label]");
}

#[test]
fn key_mode_rejects_wrong_tab_argument() {
    assert_eq!(KeyMode::Tabbed.derive(None, "s", "f"), Err(KeyModeError::MissingTab));
    assert_eq!(KeyMode::Flat.derive(Some("t"), "s", "f"), Err(KeyModeError::UnexpectedTab("t".to_string())));
    assert_eq!(KeyMode::Flat.derive(None, "s", "f").map(|key| key.to_string()), Ok("s_f".to_string()));
    assert_eq!(KeyMode::Tabbed.derive(Some("t"), "s", "f").map(|key| key.to_string()), Ok("t_s_f".to_string()));
}

proptest! {
    #[test]
    fn underscore_free_ids_derive_distinct_keys(
        triples in proptest::collection::btree_set(("[a-z0-9]{1,6}", "[a-z0-9]{1,6}", "[a-z0-9]{1,6}"), 1..24)
    ) {
        let keys: BTreeSet<String> = triples
            .iter()
            .map(|(tab, section, field)| derive_key(Some(tab.as_str()), section, field).to_string())
            .collect();
        prop_assert_eq!(keys.len(), triples.len());
    }

    #[test]
    fn derivation_is_deterministic(section in "[a-z_]{1,8}", field in "[a-z_]{1,8}") {
        prop_assert_eq!(derive_key(None, &section, &field), derive_key(None, &section, &field));
    }
}
