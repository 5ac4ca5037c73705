// crates/wpsf-core/src/core/keys.rs
// ============================================================================
// Module: WPSF Key Derivation
// Description: Storage keys and form input names derived from schema ids.
// Purpose: Keep key and name derivation pure, total, and shared by all layers.
// Dependencies: crate::core::identifiers, thiserror
// ============================================================================

//! ## Overview
//! Every field value is addressed by a key derived from its position in the
//! schema: `{tab}_{section}_{field}` in tabbed schemas and `{section}_{field}`
//! otherwise. The same key is used in persisted documents, in form input
//! names (`{group}_settings[{key}]`), and in element ids.
//!
//! Derivation is not injective for identifiers containing `_`. Schema
//! construction rejects colliding keys, so lookups through a built schema
//! never alias.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::identifiers::GroupId;
use crate::core::identifiers::SettingKey;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Separator placed between identifier segments in a derived key.
pub const KEY_SEPARATOR: char = '_';

/// Suffix appended to the group id to form the persisted option name.
pub const OPTION_SUFFIX: &str = "_settings";

// ============================================================================
// SECTION: Key Mode
// ============================================================================

/// Addressing mode of a schema, fixed by whether it declares tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMode {
    /// Keys carry a tab prefix.
    Tabbed,
    /// Keys are `{section}_{field}`.
    Flat,
}

impl KeyMode {
    /// Returns the stable label for this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tabbed => "tabbed",
            Self::Flat => "flat",
        }
    }

    /// Derives a key, rejecting a tab argument that contradicts the mode.
    ///
    /// # Errors
    ///
    /// Returns [`KeyModeError`] when a tab is missing in tabbed mode or
    /// supplied in flat mode.
    pub fn derive(
        self,
        tab_id: Option<&str>,
        section_id: &str,
        field_id: &str,
    ) -> Result<SettingKey, KeyModeError> {
        match (self, tab_id) {
            (Self::Tabbed, Some(_)) | (Self::Flat, None) => {
                Ok(derive_key(tab_id, section_id, field_id))
            }
            (Self::Tabbed, None) => Err(KeyModeError::MissingTab),
            (Self::Flat, Some(tab)) => Err(KeyModeError::UnexpectedTab(tab.to_string())),
        }
    }
}

/// Key mode mismatch errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyModeError {
    /// A tabbed schema was addressed without a tab id.
    #[error("tabbed schema requires a tab id")]
    MissingTab,
    /// A flat schema was addressed with a tab id.
    #[error("flat schema does not accept tab id {0}")]
    UnexpectedTab(String),
}

// ============================================================================
// SECTION: Derivation
// ============================================================================

/// Derives the storage key for a field.
///
/// Returns `{tab}_{section}_{field}` when a tab is given and
/// `{section}_{field}` otherwise.
#[must_use]
pub fn derive_key(tab_id: Option<&str>, section_id: &str, field_id: &str) -> SettingKey {
    let mut key = String::with_capacity(
        tab_id.map_or(0, |tab| tab.len() + 1) + section_id.len() + field_id.len() + 1,
    );
    if let Some(tab) = tab_id {
        key.push_str(tab);
        key.push(KEY_SEPARATOR);
    }
    key.push_str(section_id);
    key.push(KEY_SEPARATOR);
    key.push_str(field_id);
    SettingKey::new(key)
}

/// Returns the persisted option name for a group (`{group}_settings`).
#[must_use]
pub fn option_name(group_id: &GroupId) -> String {
    format!("{}{OPTION_SUFFIX}", group_id.as_str())
}

/// Returns the form input name for a key (`{group}_settings[{key}]`).
#[must_use]
pub fn field_name(group_id: &GroupId, key: &str) -> String {
    format!("{}[{key}]", option_name(group_id))
}

/// Returns the element id of a group subfield (`{id}_{row}_{sub}`).
#[must_use]
pub fn group_row_id(field_id: &str, row: usize, subfield_id: &str) -> String {
    format!("{field_id}_{row}_{subfield_id}")
}

/// Returns the input name of a group subfield (`{name}[{row}][{sub}]`).
#[must_use]
pub fn group_row_name(field_name: &str, row: usize, subfield_id: &str) -> String {
    format!("{field_name}[{row}][{subfield_id}]")
}

/// Returns the input name of the hidden row id of a group row.
#[must_use]
pub fn group_row_id_name(field_name: &str, row: usize) -> String {
    format!("{field_name}[{row}][row_id]")
}

/// Returns the element id of a group's blank row template.
#[must_use]
pub fn group_template_id(field_id: &str) -> String {
    format!("{field_id}_template")
}
