// crates/wpsf-core/src/core/schema.rs
// ============================================================================
// Module: WPSF Schema Model
// Description: Declarative schema sources and the validated, ordered schema.
// Purpose: Build an immutable schema with stable section order and unique keys.
// Dependencies: crate::core::{identifiers, keys, visibility}, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`SchemaSource`] is deserialized from a host-supplied JSON or TOML
//! document. [`Schema::build`] validates it and produces the immutable
//! [`Schema`] every other component reads.
//!
//! ## Section Order
//! Sections sort stably by `section_order`. A section without an order takes
//! the order of the nearest preceding section in declaration order (0 when
//! none precedes), so unordered sections stay next to the section they were
//! declared after.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::de::MapAccess;
use serde::de::SeqAccess;
use serde::de::Visitor;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::FieldId;
use crate::core::identifiers::GroupId;
use crate::core::identifiers::SectionId;
use crate::core::identifiers::SettingKey;
use crate::core::identifiers::TabId;
use crate::core::keys::KeyMode;
use crate::core::keys::derive_key;
use crate::core::visibility::Condition;
use crate::core::visibility::Conditional;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Field type used when a field omits `type`.
pub const DEFAULT_FIELD_TYPE: &str = "text";

/// Field type whose subfields render as repeatable rows.
pub const GROUP_FIELD_TYPE: &str = "group";

/// Default link text for help links.
pub const DEFAULT_LINK_TEXT: &str = "Learn More";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Schema construction errors. Fatal at initialization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The schema has no usable group id.
    #[error("schema group_id is missing or empty")]
    MissingGroupId,
    /// A tab lacks its id.
    #[error("tab at position {index} is missing an id")]
    InvalidTab {
        /// Declaration index of the tab.
        index: usize,
    },
    /// A section lacks its id or title.
    #[error("section at position {index} is missing section_id or section_title")]
    InvalidSection {
        /// Declaration index of the section.
        index: usize,
    },
    /// A section references a tab that does not exist.
    #[error("section {section_id} references unknown tab {tab_id}")]
    UnknownTab {
        /// Offending section id.
        section_id: String,
        /// Referenced tab id (empty when missing).
        tab_id: String,
    },
    /// An identifier is declared twice in the same scope.
    #[error("duplicate {kind} id {id}")]
    DuplicateId {
        /// Kind of identifier (`tab`, `section`, `field`, `subfield`).
        kind: &'static str,
        /// Repeated identifier.
        id: String,
    },
    /// A field lacks an id.
    #[error("field at position {index} in section {section_id} is missing an id")]
    InvalidField {
        /// Section containing the field.
        section_id: String,
        /// Declaration index of the field (or subfield).
        index: usize,
    },
    /// Two fields derive the same storage key.
    #[error("derived key collision on {key}")]
    KeyCollision {
        /// Colliding key.
        key: String,
    },
}

// ============================================================================
// SECTION: Choices
// ============================================================================

/// Label attached to one choice value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ChoiceLabel {
    /// Plain text label.
    Text(String),
    /// Image picker label.
    Image {
        /// Caption text.
        #[serde(default)]
        text: String,
        /// Image URL.
        image: String,
    },
    /// Nested choices rendered as an option group.
    Group(Choices),
}

impl ChoiceLabel {
    /// Returns the caption text (empty for option groups).
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Text(text)
            | Self::Image {
                text, ..
            } => text,
            Self::Group(_) => "",
        }
    }

    /// Returns the image URL for image labels.
    #[must_use]
    pub fn image(&self) -> Option<&str> {
        match self {
            Self::Image {
                image, ..
            } => Some(image),
            Self::Text(_) | Self::Group(_) => None,
        }
    }
}

/// Ordered choice map (value to label).
///
/// Declaration order is preserved. A JSON array deserializes with its indexes
/// as values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Choices(Vec<(String, ChoiceLabel)>);

impl Choices {
    /// Creates choices from ordered entries.
    #[must_use]
    pub const fn new(entries: Vec<(String, ChoiceLabel)>) -> Self {
        Self(entries)
    }

    /// Iterates entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChoiceLabel)> {
        self.0.iter().map(|(value, label)| (value.as_str(), label))
    }

    /// Returns the number of top-level entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when there are no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for Choices {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ChoicesVisitor)
    }
}

/// Order-preserving visitor for [`Choices`].
struct ChoicesVisitor;

impl<'de> Visitor<'de> for ChoicesVisitor {
    type Value = Choices;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a map or list of choices")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((value, label)) = map.next_entry::<String, ChoiceLabel>()? {
            entries.push((value, label));
        }
        Ok(Choices(entries))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut entries = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(label) = seq.next_element::<ChoiceLabel>()? {
            entries.push((entries.len().to_string(), label));
        }
        Ok(Choices(entries))
    }
}

// ============================================================================
// SECTION: Link Descriptor
// ============================================================================

/// Help link attached to a field title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Link {
    /// Target URL; the link is ignored without one.
    #[serde(default)]
    pub url: Option<String>,
    /// Link text.
    #[serde(default)]
    pub text: Option<String>,
    /// Opens in a new window when true (default).
    #[serde(default)]
    pub external: Option<bool>,
    /// `tooltip` (default) or any other value to append to the subtitle.
    #[serde(default, rename = "type")]
    pub link_type: Option<String>,
}

impl Link {
    /// Returns the link text, defaulting to "Learn More".
    #[must_use]
    pub fn text(&self) -> &str {
        self.text.as_deref().filter(|text| !text.is_empty()).unwrap_or(DEFAULT_LINK_TEXT)
    }

    /// Returns true when the link opens in a new window.
    #[must_use]
    pub fn is_external(&self) -> bool {
        self.external.unwrap_or(true)
    }

    /// Returns true when the link renders as a tooltip next to the title.
    #[must_use]
    pub fn is_tooltip(&self) -> bool {
        self.link_type.as_deref().is_none_or(|kind| kind == "tooltip")
    }
}

// ============================================================================
// SECTION: Schema Elements
// ============================================================================

/// Tab grouping sections.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tab {
    /// Tab identifier.
    #[serde(default)]
    pub id: TabId,
    /// Tab title.
    #[serde(default)]
    pub title: String,
    /// Optional extra CSS class.
    #[serde(default)]
    pub class: Option<String>,
    /// Show conditions.
    #[serde(default)]
    pub show_if: Option<Vec<Condition>>,
    /// Hide conditions.
    #[serde(default)]
    pub hide_if: Option<Vec<Condition>>,
}

/// Section holding fields.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Section {
    /// Section identifier.
    #[serde(default)]
    pub section_id: Option<SectionId>,
    /// Section title.
    #[serde(default)]
    pub section_title: Option<String>,
    /// Sort order.
    #[serde(default)]
    pub section_order: Option<i64>,
    /// Owning tab (tabbed schemas only).
    #[serde(default)]
    pub tab_id: Option<TabId>,
    /// Optional HTML description.
    #[serde(default)]
    pub section_description: Option<String>,
    /// Fields in declaration order.
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Show conditions.
    #[serde(default)]
    pub show_if: Option<Vec<Condition>>,
    /// Hide conditions.
    #[serde(default)]
    pub hide_if: Option<Vec<Condition>>,
}

impl Section {
    /// Returns the section id (empty only on unbuilt sources).
    #[must_use]
    pub fn id(&self) -> &str {
        self.section_id.as_ref().map_or("", SectionId::as_str)
    }

    /// Returns the section title.
    #[must_use]
    pub fn title(&self) -> &str {
        self.section_title.as_deref().unwrap_or("")
    }

    /// Returns the owning tab id, if any.
    #[must_use]
    pub fn tab(&self) -> Option<&str> {
        self.tab_id.as_ref().map(TabId::as_str)
    }
}

/// Field definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Field {
    /// Field identifier.
    #[serde(default)]
    pub id: FieldId,
    /// Strategy type tag.
    #[serde(default = "default_field_type", rename = "type")]
    pub field_type: String,
    /// Row title.
    #[serde(default)]
    pub title: String,
    /// Description paragraph (HTML allowed).
    #[serde(default)]
    pub desc: String,
    /// Subtitle under the title (HTML allowed).
    #[serde(default)]
    pub subtitle: String,
    /// Declared default value.
    #[serde(default, alias = "std")]
    pub default: Option<Value>,
    /// Ordered choices.
    #[serde(default)]
    pub choices: Choices,
    /// Placeholder text.
    #[serde(default)]
    pub placeholder: String,
    /// CSS class for the input.
    #[serde(default)]
    pub class: String,
    /// Group subfields.
    #[serde(default)]
    pub subfields: Vec<Field>,
    /// Show conditions.
    #[serde(default)]
    pub show_if: Option<Vec<Condition>>,
    /// Hide conditions.
    #[serde(default)]
    pub hide_if: Option<Vec<Condition>>,
    /// Help link.
    #[serde(default)]
    pub link: Option<Link>,
    /// Type-specific options (`multiple`, `mimetype`, `output`, ...).
    #[serde(flatten)]
    pub options: BTreeMap<String, Value>,
}

/// Returns the default field type for serde.
fn default_field_type() -> String {
    DEFAULT_FIELD_TYPE.to_string()
}

impl Field {
    /// Returns a type-specific option.
    #[must_use]
    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    /// Returns a type-specific option as a string.
    #[must_use]
    pub fn option_str(&self, name: &str) -> Option<&str> {
        self.options.get(name).and_then(Value::as_str)
    }

    /// Returns a type-specific option as a flag (`true`, `1`, `"1"`).
    #[must_use]
    pub fn option_flag(&self, name: &str) -> bool {
        match self.options.get(name) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(number)) => number.as_i64().is_some_and(|n| n != 0),
            Some(Value::String(text)) => !text.is_empty() && text != "0",
            _ => false,
        }
    }

    /// Returns true for group fields.
    #[must_use]
    pub fn is_group(&self) -> bool {
        self.field_type == GROUP_FIELD_TYPE
    }
}

impl Conditional for Tab {
    fn show_if(&self) -> Option<&[Condition]> {
        self.show_if.as_deref()
    }

    fn hide_if(&self) -> Option<&[Condition]> {
        self.hide_if.as_deref()
    }
}

impl Conditional for Section {
    fn show_if(&self) -> Option<&[Condition]> {
        self.show_if.as_deref()
    }

    fn hide_if(&self) -> Option<&[Condition]> {
        self.hide_if.as_deref()
    }
}

impl Conditional for Field {
    fn show_if(&self) -> Option<&[Condition]> {
        self.show_if.as_deref()
    }

    fn hide_if(&self) -> Option<&[Condition]> {
        self.hide_if.as_deref()
    }
}

// ============================================================================
// SECTION: Schema Source
// ============================================================================

/// Declarative schema document as supplied by the host.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SchemaSource {
    /// Settings group id.
    #[serde(default)]
    pub group_id: Option<String>,
    /// Tabs in declaration order.
    #[serde(default)]
    pub tabs: Vec<Tab>,
    /// Sections in declaration order.
    #[serde(default)]
    pub sections: Vec<Section>,
}

// ============================================================================
// SECTION: Schema
// ============================================================================

/// One field together with its section and derived key.
#[derive(Debug, Clone, Copy)]
pub struct FieldEntry<'a> {
    /// Owning section.
    pub section: &'a Section,
    /// Field definition.
    pub field: &'a Field,
    /// Derived storage key.
    pub key: &'a SettingKey,
}

/// Validated, immutable schema.
///
/// # Invariants
/// - `group_id` is non-empty.
/// - Sections are sorted by effective order, ties in declaration order.
/// - Every field has a non-empty id and a derived key unique in the schema.
/// - With tabs, every section references an existing tab.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// Settings group id.
    group_id: GroupId,
    /// Tabs in declaration order.
    tabs: Vec<Tab>,
    /// Sections in sorted order.
    sections: Vec<Section>,
    /// Derived keys parallel to `sections[i].fields[j]`.
    keys: Vec<Vec<SettingKey>>,
}

impl Schema {
    /// Validates a source and builds the schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when the source is malformed.
    pub fn build(source: SchemaSource) -> Result<Self, SchemaError> {
        let group_id = source
            .group_id
            .filter(|group| !group.trim().is_empty())
            .map(GroupId::new)
            .ok_or(SchemaError::MissingGroupId)?;

        let mut tab_ids = BTreeSet::new();
        for (index, tab) in source.tabs.iter().enumerate() {
            if tab.id.is_empty() {
                return Err(SchemaError::InvalidTab {
                    index,
                });
            }
            if !tab_ids.insert(tab.id.as_str()) {
                return Err(SchemaError::DuplicateId {
                    kind: "tab",
                    id: tab.id.to_string(),
                });
            }
        }
        let has_tabs = !source.tabs.is_empty();

        let mut section_scopes = BTreeSet::new();
        for (index, section) in source.sections.iter().enumerate() {
            let section_id = match (&section.section_id, &section.section_title) {
                (Some(id), Some(_)) if !id.is_empty() => id.as_str(),
                _ => {
                    return Err(SchemaError::InvalidSection {
                        index,
                    });
                }
            };
            let scope = if has_tabs {
                match section.tab() {
                    Some(tab) if tab_ids.contains(tab) => Some(tab),
                    other => {
                        return Err(SchemaError::UnknownTab {
                            section_id: section_id.to_string(),
                            tab_id: other.unwrap_or_default().to_string(),
                        });
                    }
                }
            } else {
                None
            };
            if !section_scopes.insert((scope, section_id)) {
                return Err(SchemaError::DuplicateId {
                    kind: "section",
                    id: section_id.to_string(),
                });
            }
            validate_fields(section_id, &section.fields, "field")?;
        }

        let sections = sort_sections(source.sections);
        let mut seen_keys = BTreeSet::new();
        let mut keys = Vec::with_capacity(sections.len());
        for section in &sections {
            let tab = if has_tabs { section.tab() } else { None };
            let mut section_keys = Vec::with_capacity(section.fields.len());
            for field in &section.fields {
                let key = derive_key(tab, section.id(), field.id.as_str());
                if !seen_keys.insert(key.clone()) {
                    return Err(SchemaError::KeyCollision {
                        key: key.to_string(),
                    });
                }
                section_keys.push(key);
            }
            keys.push(section_keys);
        }

        Ok(Self {
            group_id,
            tabs: source.tabs,
            sections,
            keys,
        })
    }

    /// Returns the group id.
    #[must_use]
    pub const fn group_id(&self) -> &GroupId {
        &self.group_id
    }

    /// Returns the tabs in declaration order.
    #[must_use]
    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    /// Returns the sections in sorted order.
    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Returns true when the schema declares tabs.
    #[must_use]
    pub fn has_tabs(&self) -> bool {
        !self.tabs.is_empty()
    }

    /// Returns the key mode fixed by the tab decision.
    #[must_use]
    pub fn key_mode(&self) -> KeyMode {
        if self.has_tabs() { KeyMode::Tabbed } else { KeyMode::Flat }
    }

    /// Returns the sections belonging to a tab, in sorted order.
    pub fn sections_for_tab<'a>(&'a self, tab_id: &'a str) -> impl Iterator<Item = &'a Section> {
        self.sections.iter().filter(move |section| section.tab() == Some(tab_id))
    }

    /// Returns true when a tab owns at least one section.
    #[must_use]
    pub fn tab_has_sections(&self, tab_id: &str) -> bool {
        self.sections_for_tab(tab_id).next().is_some()
    }

    /// Returns every field with its section and derived key, in render order.
    pub fn field_entries(&self) -> impl Iterator<Item = FieldEntry<'_>> {
        self.sections.iter().zip(&self.keys).flat_map(|(section, keys)| {
            section.fields.iter().zip(keys).map(move |(field, key)| FieldEntry {
                section,
                field,
                key,
            })
        })
    }

    /// Returns the fields of one section with their derived keys.
    pub fn section_entries<'a>(&'a self, section: &'a Section) -> impl Iterator<Item = FieldEntry<'a>> {
        self.field_entries().filter(move |entry| std::ptr::eq(entry.section, section))
    }
}

/// Validates field and subfield ids within one scope.
fn validate_fields(section_id: &str, fields: &[Field], kind: &'static str) -> Result<(), SchemaError> {
    let mut ids = BTreeSet::new();
    for (index, field) in fields.iter().enumerate() {
        if field.id.is_empty() {
            return Err(SchemaError::InvalidField {
                section_id: section_id.to_string(),
                index,
            });
        }
        if !ids.insert(field.id.as_str()) {
            return Err(SchemaError::DuplicateId {
                kind,
                id: field.id.to_string(),
            });
        }
        if field.is_group() {
            validate_fields(section_id, &field.subfields, "subfield")?;
        }
    }
    Ok(())
}

/// Sorts sections stably by effective order.
///
/// Unordered sections inherit the order of the nearest preceding section.
#[must_use]
pub fn sort_sections(sections: Vec<Section>) -> Vec<Section> {
    let mut previous = 0_i64;
    let mut ordered: Vec<(i64, Section)> = sections
        .into_iter()
        .map(|section| {
            let order = section.section_order.unwrap_or(previous);
            previous = order;
            (order, section)
        })
        .collect();
    ordered.sort_by_key(|(order, _)| *order);
    ordered.into_iter().map(|(_, section)| section).collect()
}
