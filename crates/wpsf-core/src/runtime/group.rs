// crates/wpsf-core/src/runtime/group.rs
// ============================================================================
// Module: WPSF Group Strategy
// Description: Repeatable subfield rows with a client-side row template.
// Purpose: Render the one recursive field type with nested ids and names.
// Dependencies: crate::{core, runtime::{fields, html, registry}}, serde_json
// ============================================================================

//! ## Overview
//! A group value is a sequence of row maps (`subfield id -> value`). Stored
//! arrays render in order; stored objects (rows posted with gaps in their
//! indexes) render sorted by numeric key. At least one row is always
//! rendered, and a blank row is emitted separately as a template for
//! client-side insertion.
//!
//! Each row carries a hidden `row_id`. A stored non-empty `row_id` is kept as
//! is; otherwise the row's position is used, so identifiers survive
//! re-renders even when rows are not contiguous.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;

use serde_json::Map;
use serde_json::Value;

use crate::core::keys::group_row_id;
use crate::core::keys::group_row_id_name;
use crate::core::keys::group_row_name;
use crate::core::keys::group_template_id;
use crate::core::values::display_text;
use crate::core::values::is_empty_value;
use crate::runtime::fields::description;
use crate::runtime::html::escape_html;
use crate::runtime::html::sanitize_class;
use crate::runtime::registry::FieldContext;
use crate::runtime::registry::FieldRegistry;
use crate::runtime::registry::FieldStrategy;

// ============================================================================
// SECTION: Strategy
// ============================================================================

/// `group` strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupStrategy;

impl FieldStrategy for GroupStrategy {
    fn render(&self, ctx: &FieldContext<'_>, registry: &FieldRegistry) -> String {
        if ctx.field.subfields.is_empty() {
            return String::new();
        }
        let rows = group_rows(&ctx.value);
        let row_count = rows.len().max(1);
        let mut out = String::from(r#"<table class="widefat wpsf-group" cellspacing="0"><tbody>"#);
        for row in 0..row_count {
            out.push_str(&render_row(ctx, registry, row, rows.get(row).copied(), false));
        }
        out.push_str("</tbody></table>");
        let _ = write!(
            out,
            r#"<script type="text/html" id="{}">{}</script>"#,
            escape_html(&group_template_id(&ctx.id)),
            render_row(ctx, registry, 0, None, true)
        );
        out.push_str(&description(&ctx.field.desc));
        out
    }
}

// ============================================================================
// SECTION: Rows
// ============================================================================

/// Returns stored rows in render order.
///
/// Arrays keep their order. Objects sort numeric keys numerically, then any
/// other keys lexicographically. Other values have no rows.
#[must_use]
pub fn group_rows(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(rows) => rows.iter().collect(),
        Value::Object(rows) => {
            let mut keyed: Vec<(Option<u64>, &String, &Value)> =
                rows.iter().map(|(key, row)| (key.parse::<u64>().ok(), key, row)).collect();
            keyed.sort_by(|left, right| match (left.0, right.0) {
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => left.1.cmp(right.1),
            });
            keyed.into_iter().map(|(_, _, row)| row).collect()
        }
        _ => Vec::new(),
    }
}

/// Returns the row id to emit for a stored row.
#[must_use]
pub fn row_id(row: Option<&Value>, index: usize) -> String {
    row.and_then(Value::as_object)
        .and_then(|cells| cells.get("row_id"))
        .filter(|value| !is_empty_value(value))
        .map_or_else(|| index.to_string(), display_text)
}

/// Renders one row (or the blank template when `blank` is set).
fn render_row(
    ctx: &FieldContext<'_>,
    registry: &FieldRegistry,
    row: usize,
    stored: Option<&Value>,
    blank: bool,
) -> String {
    let cells: Option<&Map<String, Value>> = stored.and_then(Value::as_object);
    let row_id_value = if blank { String::new() } else { row_id(stored, row) };
    let mut out = format!(
        r#"<tr class="wpsf-group__row{}"><td class="wpsf-group__row-index"><span>{row}</span></td><td class="wpsf-group__row-fields"><input type="hidden" class="wpsf-group__row-id" name="{}" value="{}" />"#,
        if row % 2 == 0 { " alternate" } else { "" },
        escape_html(&group_row_id_name(&ctx.name, row)),
        escape_html(&row_id_value)
    );
    for subfield in &ctx.field.subfields {
        let value = if blank {
            Value::String(String::new())
        } else {
            cells
                .and_then(|cells| cells.get(subfield.id.as_str()))
                .cloned()
                .unwrap_or_else(|| Value::String(String::new()))
        };
        let sub_ctx = FieldContext {
            env: ctx.env,
            field: subfield,
            id: group_row_id(&ctx.id, row, subfield.id.as_str()),
            name: group_row_name(&ctx.name, row, subfield.id.as_str()),
            value,
            class: subfield.class.clone(),
        };
        let _ = write!(
            out,
            r#"<div class="wpsf-group__field-wrapper wpsf-group__field-wrapper--{}"><label for="{}" class="wpsf-group__field-label">{}</label>{}</div>"#,
            sanitize_class(&subfield.field_type),
            escape_html(&sub_ctx.id),
            escape_html(&subfield.title),
            registry.render(&sub_ctx)
        );
    }
    let _ = write!(
        out,
        r#"</td><td class="wpsf-group__row-actions"><a href="javascript: void(0);" class="wpsf-group__row-add" data-template="{}"><span class="dashicons dashicons-plus-alt"></span></a><a href="javascript: void(0);" class="wpsf-group__row-remove"><span class="dashicons dashicons-trash"></span></a></td></tr>"#,
        escape_html(&group_template_id(&ctx.id))
    );
    out
}
