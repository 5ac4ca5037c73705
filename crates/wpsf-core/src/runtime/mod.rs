// crates/wpsf-core/src/runtime/mod.rs
// ============================================================================
// Module: WPSF Runtime
// Description: Settings store, field rendering, transfer pipeline, and engine.
// Purpose: Execute settings operations against host-supplied collaborators.
// Dependencies: crate::{audit, core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules resolve and persist settings, render the settings page
//! through the field strategy registry, decode form submissions, and move
//! whole documents in and out. [`SettingsEngine`] ties them together; hosts
//! should go through it so every write is authorized and audited.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod engine;
pub mod fields;
pub mod group;
pub mod html;
pub mod memory;
pub mod registry;
pub mod render;
pub mod store;
pub mod submission;
pub mod tokens;
pub mod transfer;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use engine::DEFAULT_AJAX_URL;
pub use engine::SettingsEngine;
pub use group::GroupStrategy;
pub use memory::InMemoryOptionStore;
pub use registry::CustomOutput;
pub use registry::FieldContext;
pub use registry::FieldRegistry;
pub use registry::FieldStrategy;
pub use registry::RegistryError;
pub use registry::RenderEnv;
pub use render::FormRenderer;
pub use render::RenderOptions;
pub use store::SettingsError;
pub use store::SettingsStore;
pub use submission::decode_submission;
pub use tokens::InMemoryTokenService;
pub use transfer::ExportDocument;
pub use transfer::ExportRequest;
pub use transfer::ImportRequest;
pub use transfer::TransferGuard;
