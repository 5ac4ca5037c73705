// crates/wpsf-core/src/lib.rs
// ============================================================================
// Module: WPSF Core Library
// Description: Public API surface for the settings form engine.
// Purpose: Expose schema types, collaborator interfaces, and runtime services.
// Dependencies: crate::{audit, core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! WPSF core turns a declarative description of tabs, sections, and fields
//! into a rendered settings form, persists submitted values as one document
//! per group, and moves that document in and out as JSON. It is
//! host-agnostic: persistence, authorization, one-time tokens, and
//! validation are supplied through explicit interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use audit::AuditOutcome;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::SettingsAuditEvent;
pub use audit::SettingsAuditSink;
pub use audit::StderrAuditSink;
pub use interfaces::AccessRequest;
pub use interfaces::AllowAllAuthorizer;
pub use interfaces::Authorizer;
pub use interfaces::AuthzDecision;
pub use interfaces::OptionStore;
pub use interfaces::PassThroughValidation;
pub use interfaces::SettingsAction;
pub use interfaces::StoreError;
pub use interfaces::TokenAction;
pub use interfaces::TokenError;
pub use interfaces::TokenService;
pub use interfaces::ValidationHook;
pub use interfaces::ValidationRejection;
pub use runtime::ExportDocument;
pub use runtime::ExportRequest;
pub use runtime::FieldContext;
pub use runtime::FieldRegistry;
pub use runtime::FieldStrategy;
pub use runtime::ImportRequest;
pub use runtime::InMemoryOptionStore;
pub use runtime::InMemoryTokenService;
pub use runtime::RenderEnv;
pub use runtime::RenderOptions;
pub use runtime::SettingsEngine;
pub use runtime::SettingsError;
pub use runtime::SettingsStore;
