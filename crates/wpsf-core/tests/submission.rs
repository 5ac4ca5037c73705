// crates/wpsf-core/tests/submission.rs
// ============================================================================
// Module: Form Submission Tests
// Description: Decoding of bracketed form input names.
// Purpose: Ensure posted pairs decode into the mapping the renderer expects.
// Dependencies: wpsf-core, serde_json
// ============================================================================
//! ## Overview
//! Feeds (name, value) pairs shaped like the rendered inputs through the
//! decoder and checks scalars, checkbox lists, and group rows.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use serde_json::json;
use wpsf_core::GroupId;
use wpsf_core::runtime::decode_submission;

#[test]
fn scalars_decode_by_key_and_later_pairs_win() {
    let decoded = decode_submission(
        &GroupId::new("g"),
        [
            ("g_settings[s_name]", "Ada"),
            ("g_settings[s_flag]", "0"),
            ("g_settings[s_flag]", "1"),
            ("option_page", "g"),
            ("other_settings[s_name]", "ignored"),
        ],
    );
    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded.get("s_name"), Some(&json!("Ada")));
    assert_eq!(decoded.get("s_flag"), Some(&json!("1")));
}

#[test]
fn appended_values_form_lists() {
    let decoded = decode_submission(
        &GroupId::new("g"),
        [("g_settings[s_colors]", "0"), ("g_settings[s_colors][]", "red"), ("g_settings[s_colors][]", "blue")],
    );
    assert_eq!(decoded.get("s_colors"), Some(&json!(["red", "blue"])));

    let unchecked = decode_submission(&GroupId::new("g"), [("g_settings[s_colors]", "0")]);
    assert_eq!(unchecked.get("s_colors"), Some(&json!("0")));
}

#[test]
fn group_rows_decode_into_row_maps() {
    let decoded = decode_submission(
        &GroupId::new("g"),
        [
            ("g_settings[s_rows][0][row_id]", "0"),
            ("g_settings[s_rows][0][label]", "first"),
            ("g_settings[s_rows][1][row_id]", "1"),
            ("g_settings[s_rows][1][label]", "second"),
        ],
    );
    assert_eq!(
        decoded.get("s_rows"),
        Some(&json!([{ "row_id": "0", "label": "first" }, { "row_id": "1", "label": "second" }]))
    );
}

#[test]
fn rows_with_gaps_stay_keyed() {
    let decoded = decode_submission(
        &GroupId::new("g"),
        [("g_settings[s_rows][0][label]", "a"), ("g_settings[s_rows][3][label]", "b")],
    );
    assert_eq!(decoded.get("s_rows"), Some(&json!({ "0": { "label": "a" }, "3": { "label": "b" } })));
}

#[test]
fn malformed_names_are_ignored() {
    let decoded = decode_submission(
        &GroupId::new("g"),
        [
            ("g_settings", "bare"),
            ("g_settings[unclosed", "x"),
            ("g_settings[a[b]]", "x"),
            ("g_settings[][x]", "x"),
            ("g_settings[ok]", "kept"),
        ],
    );
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded.get("ok"), Some(&json!("kept")));
}
