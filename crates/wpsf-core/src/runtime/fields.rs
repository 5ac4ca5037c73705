// crates/wpsf-core/src/runtime/fields.rs
// ============================================================================
// Module: WPSF Built-in Field Strategies
// Description: Markup renderers for the built-in field types.
// Purpose: Populate the field registry with the standard input types.
// Dependencies: crate::{core, runtime::{html, registry, group}}, serde_json
// ============================================================================

//! ## Overview
//! Each built-in type is a plain function registered under its type tag.
//! Values, ids, names, placeholders, and classes are escaped; `desc` and
//! `subtitle` are host-authored HTML and are emitted verbatim.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;

use serde_json::Value;

use crate::core::ChoiceLabel;
use crate::core::Choices;
use crate::core::values::display_text;
use crate::core::values::is_empty_value;
use crate::runtime::group::GroupStrategy;
use crate::runtime::html::escape_html;
use crate::runtime::html::escape_url;
use crate::runtime::html::query_string;
use crate::runtime::registry::FieldContext;
use crate::runtime::registry::FieldRegistry;

// ============================================================================
// SECTION: Registration
// ============================================================================

/// Registers every built-in strategy.
pub fn register_builtins(registry: &mut FieldRegistry) {
    registry.register("text", render_text);
    registry.register("hidden", render_hidden);
    registry.register("number", render_number);
    registry.register("password", render_password);
    registry.register("time", render_time);
    registry.register("date", render_date);
    registry.register("textarea", render_textarea);
    registry.register("select", render_select);
    registry.register("radio", render_radio);
    registry.register("checkbox", render_checkbox);
    registry.register("toggle", render_toggle);
    registry.register("checkboxes", render_checkboxes);
    registry.register("image_radio", render_image_radio);
    registry.register("image_checkboxes", render_image_checkboxes);
    registry.register("color", render_color);
    registry.register("file", render_file);
    registry.register("editor", render_editor);
    registry.register("code_editor", render_code_editor);
    registry.register("multiinputs", render_multiinputs);
    registry.register("export", render_export);
    registry.register("import", render_import);
    registry.register("custom", render_custom);
    registry.register("group", GroupStrategy);
}

// ============================================================================
// SECTION: Shared Markup
// ============================================================================

/// Returns the description paragraph, or nothing for an empty description.
#[must_use]
pub fn description(desc: &str) -> String {
    if desc.is_empty() { String::new() } else { format!(r#"<p class="description">{desc}</p>"#) }
}

/// Renders a single-line input with the `regular-text` class.
fn text_input(kind: &str, ctx: &FieldContext<'_>) -> String {
    format!(
        r#"<input type="{kind}" name="{}" id="{}" value="{}" placeholder="{}" class="regular-text {}" />{}"#,
        escape_html(&ctx.name),
        escape_html(&ctx.id),
        escape_html(&ctx.value_text()),
        escape_html(&ctx.field.placeholder),
        escape_html(&ctx.class),
        description(&ctx.field.desc)
    )
}

/// Renders a picker input carrying its JSON options in a data attribute.
fn picker_input(kind: &str, picker: &str, ctx: &FieldContext<'_>) -> String {
    let options = ctx
        .field
        .option(picker)
        .filter(|value| !is_empty_value(value))
        .map(Value::to_string)
        .unwrap_or_default();
    format!(
        r#"<input type="{kind}" name="{}" id="{}" value="{}" class="{picker} {}" data-{picker}="{}" />{}"#,
        escape_html(&ctx.name),
        escape_html(&ctx.id),
        escape_html(&ctx.value_text()),
        escape_html(&ctx.class),
        escape_html(&options),
        description(&ctx.field.desc)
    )
}

/// Renders the `checked` attribute.
const fn checked(is_checked: bool) -> &'static str {
    if is_checked { r#" checked="checked""# } else { "" }
}

/// Renders the `selected` attribute.
const fn selected(is_selected: bool) -> &'static str {
    if is_selected { r#" selected="selected""# } else { "" }
}

/// Returns the element id of one choice (`{id}_{value}`).
fn choice_id(ctx: &FieldContext<'_>, value: &str) -> String {
    escape_html(&format!("{}_{value}", ctx.id))
}

// ============================================================================
// SECTION: Inputs
// ============================================================================

/// `text` strategy.
fn render_text(ctx: &FieldContext<'_>, _registry: &FieldRegistry) -> String {
    text_input("text", ctx)
}

/// `number` strategy.
fn render_number(ctx: &FieldContext<'_>, _registry: &FieldRegistry) -> String {
    text_input("number", ctx)
}

/// `password` strategy.
fn render_password(ctx: &FieldContext<'_>, _registry: &FieldRegistry) -> String {
    text_input("password", ctx)
}

/// `hidden` strategy.
fn render_hidden(ctx: &FieldContext<'_>, _registry: &FieldRegistry) -> String {
    format!(
        r#"<input type="hidden" name="{}" id="{}" value="{}" class="hidden-field {}" />"#,
        escape_html(&ctx.name),
        escape_html(&ctx.id),
        escape_html(&ctx.value_text()),
        escape_html(&ctx.class)
    )
}

/// `time` strategy.
fn render_time(ctx: &FieldContext<'_>, _registry: &FieldRegistry) -> String {
    picker_input("time", "timepicker", ctx)
}

/// `date` strategy.
fn render_date(ctx: &FieldContext<'_>, _registry: &FieldRegistry) -> String {
    picker_input("date", "datepicker", ctx)
}

/// `textarea` strategy.
fn render_textarea(ctx: &FieldContext<'_>, _registry: &FieldRegistry) -> String {
    format!(
        r#"<textarea name="{}" id="{}" placeholder="{}" rows="5" cols="60" class="{}">{}</textarea>{}"#,
        escape_html(&ctx.name),
        escape_html(&ctx.id),
        escape_html(&ctx.field.placeholder),
        escape_html(&ctx.class),
        escape_html(&ctx.value_text()),
        description(&ctx.field.desc)
    )
}

/// `color` strategy.
fn render_color(ctx: &FieldContext<'_>, _registry: &FieldRegistry) -> String {
    let id = escape_html(&ctx.id);
    format!(
        r#"<div style="position:relative;"><input type="text" name="{}" id="{id}" value="{}" class="wpsf-color {}" data-colorpicker="{id}_cp"><div id="{id}_cp" class="wpsf-color__picker"></div>{}</div>"#,
        escape_html(&ctx.name),
        escape_html(&ctx.value_text()),
        escape_html(&ctx.class),
        description(&ctx.field.desc)
    )
}

/// `file` strategy.
fn render_file(ctx: &FieldContext<'_>, _registry: &FieldRegistry) -> String {
    let id = escape_html(&ctx.id);
    format!(
        r#"<input type="text" name="{}" id="{id}" value="{}" class="regular-text {}"> <input type="button" class="button wpsf-browse" id="{id}_button" data-target="{id}" value="Browse" />{}"#,
        escape_html(&ctx.name),
        escape_html(&ctx.value_text()),
        escape_html(&ctx.class),
        description(&ctx.field.desc)
    )
}

/// `editor` strategy.
fn render_editor(ctx: &FieldContext<'_>, _registry: &FieldRegistry) -> String {
    let settings = ctx.field.option("editor_settings").map(Value::to_string).unwrap_or_default();
    format!(
        r#"<textarea name="{}" id="{}" rows="10" class="wpsf-editor {}" data-editor-settings="{}">{}</textarea>{}"#,
        escape_html(&ctx.name),
        escape_html(&ctx.id),
        escape_html(&ctx.class),
        escape_html(&settings),
        escape_html(&ctx.value_text()),
        description(&ctx.field.desc)
    )
}

/// `code_editor` strategy.
fn render_code_editor(ctx: &FieldContext<'_>, _registry: &FieldRegistry) -> String {
    format!(
        r#"<textarea name="{}" id="{}" placeholder="{}" rows="5" cols="60" class="{}" data-mimetype="{}">{}</textarea>{}"#,
        escape_html(&ctx.name),
        escape_html(&ctx.id),
        escape_html(&ctx.field.placeholder),
        escape_html(&ctx.class),
        escape_html(ctx.field.option_str("mimetype").unwrap_or_default()),
        escape_html(&ctx.value_text()),
        description(&ctx.field.desc)
    )
}

/// `multiinputs` strategy; input captions come from the default's keys.
fn render_multiinputs(ctx: &FieldContext<'_>, _registry: &FieldRegistry) -> String {
    let titles: Vec<String> = match &ctx.field.default {
        Some(Value::Object(entries)) => entries.keys().cloned().collect(),
        _ => Vec::new(),
    };
    let mut out = String::from(r#"<div class="wpsf-multifields">"#);
    for (index, value) in ctx.value_items().iter().enumerate() {
        let _ = write!(
            out,
            r#"<div class="wpsf-multifields__field"><input type="text" name="{}[]" id="{}" value="{}" class="regular-text {}" placeholder="{}" /><br><span>{}</span></div>"#,
            escape_html(&ctx.name),
            choice_id(ctx, &index.to_string()),
            escape_html(value),
            escape_html(&ctx.class),
            escape_html(&ctx.field.placeholder),
            escape_html(titles.get(index).map_or("", String::as_str))
        );
    }
    out.push_str("</div>");
    out.push_str(&description(&ctx.field.desc));
    out
}

// ============================================================================
// SECTION: Choice Inputs
// ============================================================================

/// `select` strategy (single or `multiple`, with optgroups).
fn render_select(ctx: &FieldContext<'_>, _registry: &FieldRegistry) -> String {
    let multiple = ctx.field.option_flag("multiple");
    let items = ctx.value_items();
    let mut out = format!(
        r#"<select {}name="{}{}" id="{}" class="{}{}">"#,
        if multiple { r#"multiple="multiple" "# } else { "" },
        escape_html(&ctx.name),
        if multiple { "[]" } else { "" },
        escape_html(&ctx.id),
        escape_html(&ctx.class),
        if multiple { " wpsf-select2" } else { "" }
    );
    write_options(&ctx.field.choices, &items, &mut out);
    out.push_str("</select>");
    out.push_str(&description(&ctx.field.desc));
    out
}

/// Writes `<option>` and `<optgroup>` elements.
fn write_options(choices: &Choices, items: &[String], out: &mut String) {
    for (value, label) in choices.iter() {
        if let ChoiceLabel::Group(nested) = label {
            let _ = write!(out, r#"<optgroup label="{}">"#, escape_html(value));
            write_options(nested, items, out);
            out.push_str("</optgroup>");
            continue;
        }
        let _ = write!(
            out,
            r#"<option value="{}"{}>{}</option>"#,
            escape_html(value),
            selected(items.iter().any(|item| item == value)),
            escape_html(label.text())
        );
    }
}

/// `radio` strategy.
fn render_radio(ctx: &FieldContext<'_>, _registry: &FieldRegistry) -> String {
    let current = ctx.value_text();
    let mut out = String::new();
    for (value, label) in ctx.field.choices.iter() {
        let _ = write!(
            out,
            r#"<label><input type="radio" name="{}" id="{}" value="{}" class="{}"{}> {}</label><br />"#,
            escape_html(&ctx.name),
            choice_id(ctx, value),
            escape_html(value),
            escape_html(&ctx.class),
            checked(current == value),
            escape_html(label.text())
        );
    }
    out.push_str(&description(&ctx.field.desc));
    out
}

/// `checkbox` strategy; the hidden input submits `0` when unchecked.
fn render_checkbox(ctx: &FieldContext<'_>, _registry: &FieldRegistry) -> String {
    let name = escape_html(&ctx.name);
    format!(
        r#"<input type="hidden" name="{name}" value="0" /><label><input type="checkbox" name="{name}" id="{}" value="1" class="{}"{}> {}</label>"#,
        escape_html(&ctx.id),
        escape_html(&ctx.class),
        checked(!is_empty_value(&ctx.value)),
        ctx.field.desc
    )
}

/// `toggle` strategy.
fn render_toggle(ctx: &FieldContext<'_>, _registry: &FieldRegistry) -> String {
    let name = escape_html(&ctx.name);
    format!(
        r#"<input type="hidden" name="{name}" value="0" /><label class="switch"><input type="checkbox" name="{name}" id="{}" value="1" class="{}"{}><span class="slider"></span></label>{}"#,
        escape_html(&ctx.id),
        escape_html(&ctx.class),
        checked(!is_empty_value(&ctx.value)),
        description(&ctx.field.desc)
    )
}

/// `checkboxes` strategy.
fn render_checkboxes(ctx: &FieldContext<'_>, _registry: &FieldRegistry) -> String {
    let name = escape_html(&ctx.name);
    let items = checked_items(&ctx.value);
    let mut out = format!(r#"<input type="hidden" name="{name}" value="0" /><ul class="wpsf-list wpsf-list--checkboxes">"#);
    for (value, label) in ctx.field.choices.iter() {
        let _ = write!(
            out,
            r#"<li><label><input type="checkbox" name="{name}[]" id="{}" value="{}" class="{}"{}> {}</label></li>"#,
            choice_id(ctx, value),
            escape_html(value),
            escape_html(&ctx.class),
            checked(items.iter().any(|item| item == value)),
            escape_html(label.text())
        );
    }
    out.push_str("</ul>");
    out.push_str(&description(&ctx.field.desc));
    out
}

/// Returns checked values; only array values check anything.
fn checked_items(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(display_text).collect(),
        _ => Vec::new(),
    }
}

/// `image_radio` strategy.
fn render_image_radio(ctx: &FieldContext<'_>, _registry: &FieldRegistry) -> String {
    let current = ctx.value_text();
    let mut out = format!(
        r#"<ul class="wpsf-visual-field wpsf-visual-field--image-radio wpsf-visual-field--grid wpsf-visual-field--cols wpsf-visual-field--col-{}">"#,
        ctx.field.choices.len()
    );
    for (value, label) in ctx.field.choices.iter() {
        let is_checked = current == value;
        write_visual_item(ctx, "radio", &escape_html(&ctx.name), value, label, is_checked, &mut out);
    }
    out.push_str("</ul>");
    out.push_str(&description(&ctx.field.desc));
    out
}

/// `image_checkboxes` strategy.
fn render_image_checkboxes(ctx: &FieldContext<'_>, _registry: &FieldRegistry) -> String {
    let name = escape_html(&ctx.name);
    let items = checked_items(&ctx.value);
    let mut out = format!(
        r#"<input type="hidden" name="{name}" value="0" /><ul class="wpsf-visual-field wpsf-visual-field--image-checkboxes wpsf-visual-field--grid wpsf-visual-field--cols">"#
    );
    let array_name = format!("{name}[]");
    for (value, label) in ctx.field.choices.iter() {
        let is_checked = items.iter().any(|item| item == value);
        write_visual_item(ctx, "checkbox", &array_name, value, label, is_checked, &mut out);
    }
    out.push_str("</ul>");
    out.push_str(&description(&ctx.field.desc));
    out
}

/// Writes one image picker item.
fn write_visual_item(
    ctx: &FieldContext<'_>,
    kind: &str,
    name: &str,
    value: &str,
    label: &ChoiceLabel,
    is_checked: bool,
    out: &mut String,
) {
    let _ = write!(
        out,
        r#"<li class="wpsf-visual-field__item{}"><label><div class="wpsf-visual-field-image-radio__img_wrap"><img src="{}"></div><div class="wpsf-visual-field__item-footer"><input type="{kind}" name="{name}" id="{}" value="{}" class="{}"{}><span class="wpsf-visual-field__item-text">{}</span></div></label></li>"#,
        if is_checked { " wpsf-visual-field__item--checked" } else { "" },
        escape_url(label.image().unwrap_or_default()),
        choice_id(ctx, value),
        escape_html(value),
        escape_html(&ctx.class),
        checked(is_checked),
        escape_html(label.text())
    );
}

// ============================================================================
// SECTION: Transfer Controls
// ============================================================================

/// `export` strategy: a download link carrying the export token.
fn render_export(ctx: &FieldContext<'_>, _registry: &FieldRegistry) -> String {
    let label = non_empty_or(ctx.value_text(), "Export Settings");
    let query = query_string(&[
        ("action", "wpsf_export_settings"),
        ("token", ctx.env.export_token.as_deref().unwrap_or_default()),
        ("option_group", ctx.env.group_id.as_str()),
    ]);
    let url = format!("{}?{query}", ctx.env.ajax_url);
    format!(
        r#"<a target="_blank" href="{}" class="button" name="{}" id="{}">{}</a>{}"#,
        escape_url(&url),
        escape_html(&ctx.name),
        escape_html(&ctx.id),
        escape_html(&label),
        description(&ctx.field.desc)
    )
}

/// `import` strategy: file picker plus the import token and group.
fn render_import(ctx: &FieldContext<'_>, _registry: &FieldRegistry) -> String {
    let label = non_empty_or(ctx.value_text(), "Import Settings");
    let id = escape_html(&ctx.id);
    format!(
        r#"<div class="wpsf-import"><div class="wpsf-import__false_btn"><input type="file" name="wpsf-import-field" class="wpsf-import__file_field" id="{id}" accept=".json"/><button type="button" name="wpsf_import_button" class="button wpsf-import__button" id="btn_{id}">{}</button><input type="hidden" class="wpsf_import_nonce" value="{}"><input type="hidden" class="wpsf_import_option_group" value="{}"></div><span class="spinner"></span></div>{}"#,
        escape_html(&label),
        escape_html(ctx.env.import_token.as_deref().unwrap_or_default()),
        escape_html(ctx.env.group_id.as_str()),
        description(&ctx.field.desc)
    )
}

/// Returns `text`, or `fallback` when it is empty.
fn non_empty_or(text: String, fallback: &str) -> String {
    if text.is_empty() { fallback.to_string() } else { text }
}

// ============================================================================
// SECTION: Custom Output
// ============================================================================

/// `custom` strategy.
///
/// The `output` option names a registered custom output; an unregistered
/// string is host HTML and renders verbatim.
fn render_custom(ctx: &FieldContext<'_>, registry: &FieldRegistry) -> String {
    let Some(output) = ctx.field.option_str("output") else {
        return String::new();
    };
    let body = match registry.custom_output(output) {
        Some(custom) => custom.render(ctx).unwrap_or_else(|message| escape_html(&message)),
        None => output.to_string(),
    };
    format!(r#"<div id="{}">{body}</div>{}"#, escape_html(&ctx.id), description(&ctx.field.desc))
}
