// crates/wpsf-core/src/runtime/render.rs
// ============================================================================
// Module: WPSF Render Orchestrator
// Description: Walks the schema and assembles the settings page markup.
// Purpose: Dispatch fields to strategies and attach visibility hints.
// Dependencies: crate::{core, runtime::{html, registry}}, serde_json
// ============================================================================

//! ## Overview
//! The orchestrator renders tab navigation, section containers, section
//! intros, and one table row per field. Field markup comes from the
//! [`FieldRegistry`]; visibility rules are attached twice, as class hints
//! for the browser script and as the canonical JSON tree in a
//! `data-wpsf-visibility` attribute.
//!
//! The value shown for a field is its persisted value when present and not
//! null, else its declared default, else an empty string.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;

use serde_json::Value;

use crate::core::Conditional;
use crate::core::Field;
use crate::core::FieldEntry;
use crate::core::Schema;
use crate::core::Section;
use crate::core::SettingsMap;
use crate::core::field_name;
use crate::core::visibility::compile;
use crate::core::visibility::visibility_classes;
use crate::runtime::html::escape_html;
use crate::runtime::html::escape_url;
use crate::runtime::html::sanitize_class;
use crate::runtime::registry::FieldContext;
use crate::runtime::registry::FieldRegistry;
use crate::runtime::registry::RenderEnv;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Page-level render switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Render the submit button below the form.
    pub show_save_button: bool,
    /// Render tab navigation for tabbed schemas.
    pub show_tab_links: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_save_button: true,
            show_tab_links: true,
        }
    }
}

// ============================================================================
// SECTION: Renderer
// ============================================================================

/// Settings page renderer.
pub struct FormRenderer<'a> {
    /// Schema being rendered.
    schema: &'a Schema,
    /// Strategy registry.
    registry: &'a FieldRegistry,
    /// Page environment.
    env: &'a RenderEnv,
    /// Render switches.
    options: RenderOptions,
}

impl<'a> FormRenderer<'a> {
    /// Creates a renderer.
    #[must_use]
    pub const fn new(
        schema: &'a Schema,
        registry: &'a FieldRegistry,
        env: &'a RenderEnv,
        options: RenderOptions,
    ) -> Self {
        Self {
            schema,
            registry,
            env,
            options,
        }
    }

    /// Renders the whole settings page.
    #[must_use]
    pub fn render_page(&self, persisted: &SettingsMap) -> String {
        let group = escape_html(self.schema.group_id().as_str());
        let mut out = format!(r#"<div class="wrap wpsf-settings wpsf-settings--{group}">"#);
        if self.schema.has_tabs() && self.options.show_tab_links {
            out.push_str(&self.render_tab_links());
        }
        let _ = write!(
            out,
            r#"<form id="wpsf_form" action="" method="post" novalidate enctype="multipart/form-data"><input type="hidden" name="option_page" value="{group}" />"#
        );
        if self.schema.has_tabs() {
            for (index, tab) in self.schema.tabs().iter().enumerate() {
                let tab_id = escape_html(tab.id.as_str());
                let _ = write!(
                    out,
                    r#"<div id="tab-{tab_id}" class="wpsf-section wpsf-tab wpsf-tab--{tab_id}{}"><div class="postbox">"#,
                    if index == 0 { " wpsf-tab--active" } else { "" }
                );
                for section in self.schema.sections_for_tab(tab.id.as_str()) {
                    out.push_str(&self.render_section(section, persisted));
                }
                out.push_str("</div></div>");
            }
        } else {
            out.push_str(r#"<div class="wpsf-section wpsf-tabless">"#);
            for section in self.schema.sections() {
                out.push_str(&self.render_section(section, persisted));
            }
            out.push_str("</div>");
        }
        if self.options.show_save_button {
            out.push_str(r#"<p class="submit"><input type="submit" class="button-primary" value="Save Changes"/></p>"#);
        }
        out.push_str("</form></div>");
        out
    }

    /// Renders tab navigation; tabs without sections are skipped.
    #[must_use]
    pub fn render_tab_links(&self) -> String {
        let mut out = String::from(r#"<ul class="wpsf-nav">"#);
        let tabs = self.schema.tabs().iter().filter(|tab| self.schema.tab_has_sections(tab.id.as_str()));
        for (index, tab) in tabs.enumerate() {
            let class = format!("{}{}", tab.class.as_deref().unwrap_or_default(), visibility_classes(tab));
            let _ = write!(
                out,
                r##"<li class="wpsf-nav__item{}"><a class="wpsf-nav__item-link {}" href="#tab-{}">{}</a></li>"##,
                if index == 0 { " wpsf-nav__item--active" } else { "" },
                escape_html(class.trim()),
                escape_html(tab.id.as_str()),
                escape_html(&tab.title)
            );
        }
        out.push_str(
            r#"<li class="wpsf-nav__item wpsf-nav__item--last"><input type="submit" class="button-primary wpsf-button-submit" value="Save Changes"></li></ul>"#,
        );
        out
    }

    /// Renders one section with its intro and field rows.
    #[must_use]
    pub fn render_section(&self, section: &Section, persisted: &SettingsMap) -> String {
        let mut out = format!("<h2>{}</h2>", escape_html(section.title()));
        out.push_str(&section_intro(section));
        out.push_str(r#"<table class="form-table" role="presentation"><tbody>"#);
        for entry in self.schema.section_entries(section) {
            out.push_str(&self.render_field_row(entry, persisted));
        }
        out.push_str("</tbody></table>");
        out
    }

    /// Renders one field row: title cell and strategy markup.
    #[must_use]
    pub fn render_field_row(&self, entry: FieldEntry<'_>, persisted: &SettingsMap) -> String {
        let field = entry.field;
        let ctx = FieldContext {
            env: self.env,
            field,
            id: entry.key.to_string(),
            name: field_name(self.schema.group_id(), entry.key.as_str()),
            value: render_value(field, persisted.get(entry.key.as_str())),
            class: format!("{}{}", field.class, visibility_classes(field)),
        };
        let row_class = if field.field_type == "hidden" { "hidden" } else { "" };
        let data = visibility_attribute(field);
        format!(
            r#"<tr class="{row_class}"{data}><th scope="row">{}</th><td>{}</td></tr>"#,
            field_title(field),
            self.registry.render(&ctx)
        )
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the value shown for a field.
#[must_use]
pub fn render_value(field: &Field, stored: Option<&Value>) -> Value {
    match stored {
        Some(value) if !value.is_null() => value.clone(),
        _ => field.default.clone().unwrap_or_else(|| Value::String(String::new())),
    }
}

/// Renders the title cell content: title, tooltip link, and subtitle.
#[must_use]
pub fn field_title(field: &Field) -> String {
    let mut tooltip = String::new();
    let mut subtitle = field.subtitle.clone();
    if let Some(link) = &field.link
        && let Some(url) = link.url.as_deref().filter(|url| !url.is_empty())
    {
        let text = escape_html(link.text());
        let label = if link.is_tooltip() {
            format!(
                r#"<i class="dashicons dashicons-info wpsf-link-icon" title="{text}"><span class="screen-reader-text">{text}</span></i>"#
            )
        } else {
            text
        };
        let target = if link.is_external() { r#" target="_blank""# } else { "" };
        let anchor = format!(r#"<a class="wpsf-link" href="{}"{target}>{label}</a>"#, escape_url(url));
        if link.is_tooltip() {
            tooltip = anchor;
        } else if subtitle.is_empty() {
            subtitle = anchor;
        } else {
            subtitle = format!("{subtitle}<br/><br/>{anchor}");
        }
    }
    let title = escape_html(&field.title);
    if subtitle.is_empty() {
        format!("{title} {tooltip}").trim_end().to_string()
    } else {
        format!(r#"{title} {tooltip}<span class="wpsf-subtitle">{subtitle}</span>"#)
    }
}

/// Renders a section intro: visibility marker and description.
#[must_use]
pub fn section_intro(section: &Section) -> String {
    let mut out = String::new();
    let classes = visibility_classes(section);
    if !classes.is_empty() {
        let _ = write!(
            out,
            r#"<span class="{}"{}></span>"#,
            escape_html(classes.trim()),
            visibility_attribute(section)
        );
    }
    if let Some(description) = section.section_description.as_deref().filter(|text| !text.is_empty()) {
        let _ = write!(
            out,
            r#"<div class="wpsf-section-description wpsf-section-description--{}">{description}</div>"#,
            sanitize_class(section.id())
        );
    }
    out
}

/// Returns the `data-wpsf-visibility` attribute for elements with rules.
fn visibility_attribute<C>(element: &C) -> String
where
    C: Conditional + ?Sized,
{
    if element.show_if().is_none() && element.hide_if().is_none() {
        return String::new();
    }
    compile(element)
        .to_json()
        .map(|json| format!(r#" data-wpsf-visibility="{}""#, escape_html(&json)))
        .unwrap_or_default()
}
