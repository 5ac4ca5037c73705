// crates/wpsf-core/src/core/mod.rs
// ============================================================================
// Module: WPSF Core Types
// Description: Schema model, identifiers, key derivation, and visibility rules.
// Purpose: Provide the pure, immutable data model every runtime component reads.
// Dependencies: serde, serde_json, smallvec, thiserror
// ============================================================================

//! ## Overview
//! Core types describe a settings form: the schema built from a host source,
//! the keys derived from it, the visibility rules compiled from its
//! conditions, and the value helpers shared by store and renderers. Nothing
//! here performs I/O.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod identifiers;
pub mod keys;
pub mod schema;
pub mod values;
pub mod visibility;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::FieldId;
pub use identifiers::GroupId;
pub use identifiers::SectionId;
pub use identifiers::SettingKey;
pub use identifiers::TabId;
pub use keys::KeyMode;
pub use keys::KeyModeError;
pub use keys::derive_key;
pub use keys::field_name;
pub use keys::group_row_id;
pub use keys::group_row_name;
pub use keys::option_name;
pub use schema::ChoiceLabel;
pub use schema::Choices;
pub use schema::Field;
pub use schema::FieldEntry;
pub use schema::Link;
pub use schema::Schema;
pub use schema::SchemaError;
pub use schema::SchemaSource;
pub use schema::Section;
pub use schema::Tab;
pub use values::SettingsMap;
pub use visibility::Clause;
pub use visibility::Condition;
pub use visibility::Conditional;
pub use visibility::FieldValues;
pub use visibility::ValueMatch;
pub use visibility::VisibilityError;
pub use visibility::VisibilityExpr;
pub use visibility::VisibilityValidator;
pub use visibility::compile;
pub use visibility::visibility_classes;
