// crates/wpsf-core/src/runtime/engine.rs
// ============================================================================
// Module: WPSF Settings Engine
// Description: Facade wiring schema, store, registry, and host collaborators.
// Purpose: Expose every settings operation behind one authorized, audited API.
// Dependencies: crate::{audit, core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! [`SettingsEngine`] is what a host embeds. It owns the settings store for
//! one group, the field registry, and the host-supplied authorizer, token
//! service, and audit sink.
//!
//! Security posture: every mutating operation is authorized first and fails
//! closed. Save, import, export, and delete each record exactly one audit
//! event, on success and on rejection alike.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;

use crate::audit::AuditOutcome;
use crate::audit::NoopAuditSink;
use crate::audit::SettingsAuditEvent;
use crate::audit::SettingsAuditSink;
use crate::core::GroupId;
use crate::core::Schema;
use crate::core::SettingsMap;
use crate::interfaces::AllowAllAuthorizer;
use crate::interfaces::Authorizer;
use crate::interfaces::OptionStore;
use crate::interfaces::SettingsAction;
use crate::interfaces::TokenAction;
use crate::interfaces::TokenService;
use crate::interfaces::ValidationHook;
use crate::runtime::registry::FieldRegistry;
use crate::runtime::registry::RenderEnv;
use crate::runtime::render::FormRenderer;
use crate::runtime::render::RenderOptions;
use crate::runtime::store::SettingsError;
use crate::runtime::store::SettingsStore;
use crate::runtime::submission::decode_submission;
use crate::runtime::tokens::InMemoryTokenService;
use crate::runtime::transfer::ExportDocument;
use crate::runtime::transfer::ExportRequest;
use crate::runtime::transfer::ImportRequest;
use crate::runtime::transfer::TransferGuard;
use crate::runtime::transfer::authorize;
use crate::runtime::transfer::export_settings;
use crate::runtime::transfer::import_settings;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default endpoint for export and import requests.
pub const DEFAULT_AJAX_URL: &str = "admin-ajax.php";

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Settings engine for one group.
///
/// # Invariants
/// - The schema is immutable once the engine is built.
/// - No operation writes after a failed authorization, token, or validation check.
pub struct SettingsEngine<S> {
    /// Settings store for the schema's group.
    store: SettingsStore<S>,
    /// Field strategy registry.
    registry: FieldRegistry,
    /// Authorization collaborator.
    authorizer: Box<dyn Authorizer>,
    /// One-time token collaborator.
    tokens: Box<dyn TokenService>,
    /// Audit sink.
    audit: Box<dyn SettingsAuditSink>,
    /// Page render switches.
    render_options: RenderOptions,
    /// Export/import endpoint.
    ajax_url: String,
}

impl<S> SettingsEngine<S>
where
    S: OptionStore,
{
    /// Creates an engine with built-in strategies, an allow-all authorizer,
    /// in-memory tokens, and no audit output.
    #[must_use]
    pub fn new(schema: Arc<Schema>, options: S) -> Self {
        Self {
            store: SettingsStore::new(schema, options),
            registry: FieldRegistry::with_builtins(),
            authorizer: Box::new(AllowAllAuthorizer),
            tokens: Box::new(InMemoryTokenService::default()),
            audit: Box::new(NoopAuditSink),
            render_options: RenderOptions::default(),
            ajax_url: DEFAULT_AJAX_URL.to_string(),
        }
    }

    /// Replaces the authorizer.
    #[must_use]
    pub fn with_authorizer(mut self, authorizer: impl Authorizer + 'static) -> Self {
        self.authorizer = Box::new(authorizer);
        self
    }

    /// Replaces the token service.
    #[must_use]
    pub fn with_tokens(mut self, tokens: impl TokenService + 'static) -> Self {
        self.tokens = Box::new(tokens);
        self
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit_sink(mut self, audit: impl SettingsAuditSink + 'static) -> Self {
        self.audit = Box::new(audit);
        self
    }

    /// Replaces the audit sink with an already boxed sink.
    #[must_use]
    pub fn with_boxed_audit_sink(mut self, audit: Box<dyn SettingsAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Replaces the validation hook run before saves.
    #[must_use]
    pub fn with_validation_hook(mut self, hook: impl ValidationHook + 'static) -> Self {
        self.store = self.store.with_validation_hook(hook);
        self
    }

    /// Replaces the page render switches.
    #[must_use]
    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.render_options = options;
        self
    }

    /// Replaces the export/import endpoint.
    #[must_use]
    pub fn with_ajax_url(mut self, ajax_url: impl Into<String>) -> Self {
        self.ajax_url = ajax_url.into();
        self
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        self.store.schema()
    }

    /// Returns the group id.
    #[must_use]
    pub fn group_id(&self) -> &GroupId {
        self.store.group_id()
    }

    /// Returns the settings store.
    #[must_use]
    pub const fn store(&self) -> &SettingsStore<S> {
        &self.store
    }

    /// Returns the field registry.
    #[must_use]
    pub const fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    /// Returns the field registry for registering strategies.
    pub const fn registry_mut(&mut self) -> &mut FieldRegistry {
        &mut self.registry
    }

    /// Renders the settings page with fresh export and import tokens.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Forbidden`] when rendering is not authorized,
    /// and token or store errors otherwise.
    pub fn render_page(&self) -> Result<String, SettingsError> {
        authorize(self.guard(), SettingsAction::Render, self.group_id())?;
        let mut env = RenderEnv::new(self.group_id().clone(), self.ajax_url.clone());
        env.export_token = Some(self.tokens.issue(TokenAction::Export)?);
        env.import_token = Some(self.tokens.issue(TokenAction::Import)?);
        let persisted = self.store.persisted()?;
        let renderer = FormRenderer::new(self.store.schema(), &self.registry, &env, self.render_options);
        Ok(renderer.render_page(&persisted))
    }

    /// Returns effective values keyed by derived key, or by bare field id
    /// when `unprefixed` is set.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Store`] when loading fails.
    pub fn read(&self, unprefixed: bool) -> Result<SettingsMap, SettingsError> {
        self.store.read(unprefixed)
    }

    /// Returns the raw persisted value of one field, or `false` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::KeyModeMismatch`] for a wrong tab argument and
    /// [`SettingsError::Store`] when loading fails.
    pub fn get_setting(
        &self,
        tab_id: Option<&str>,
        section_id: &str,
        field_id: &str,
    ) -> Result<Value, SettingsError> {
        self.store.get_setting(tab_id, section_id, field_id)
    }

    /// Returns the effective value of a field by bare id, or `default`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Store`] when loading fails.
    pub fn get_option(&self, field_id: &str, default: Value) -> Result<Value, SettingsError> {
        self.store.get_option(field_id, default)
    }

    /// Issues a one-time token for an export or import request.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Token`] when issuance fails.
    pub fn issue_token(&self, action: TokenAction) -> Result<String, SettingsError> {
        Ok(self.tokens.issue(action)?)
    }

    /// Validates and persists a submitted settings mapping.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Forbidden`] when saving is not authorized,
    /// [`SettingsError::ValidationFailed`] when the hook rejects the input,
    /// and store errors otherwise.
    pub fn save(&mut self, input: SettingsMap) -> Result<SettingsMap, SettingsError> {
        let result = authorize(self.guard(), SettingsAction::Save, self.group_id())
            .and_then(|()| self.store.validate_and_persist(input));
        self.record(SettingsAction::Save, self.group_id().clone(), result.as_ref().map(SettingsMap::len));
        result
    }

    /// Decodes posted form pairs for this group and saves them.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`SettingsEngine::save`].
    pub fn save_form<I, K, V>(&mut self, pairs: I) -> Result<SettingsMap, SettingsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let input = decode_submission(self.group_id(), pairs);
        self.save(input)
    }

    /// Exports a group's persisted document.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Forbidden`] for authorization or token
    /// failures, and store or serialization errors otherwise.
    pub fn export(&self, request: &ExportRequest) -> Result<ExportDocument, SettingsError> {
        let result = export_settings(&self.store, self.guard(), request);
        self.record(
            SettingsAction::Export,
            request.group_id.clone(),
            result.as_ref().map(|document| document.key_count),
        );
        result
    }

    /// Imports a document, replacing this group's persisted document.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Forbidden`] for authorization, group, or
    /// token failures, [`SettingsError::InvalidFormat`] for a bad payload,
    /// and store errors otherwise.
    pub fn import(&mut self, request: &ImportRequest) -> Result<usize, SettingsError> {
        let guard = TransferGuard {
            authorizer: self.authorizer.as_ref(),
            tokens: self.tokens.as_ref(),
        };
        let result = import_settings(&mut self.store, guard, request);
        self.record(SettingsAction::Import, request.group_id.clone(), result.as_ref().copied());
        result
    }

    /// Deletes this group's persisted document.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Forbidden`] when deletion is not authorized,
    /// and store errors otherwise.
    pub fn delete_all(&mut self) -> Result<(), SettingsError> {
        let result = authorize(self.guard(), SettingsAction::Delete, self.group_id())
            .and_then(|()| self.store.delete_all());
        self.record(SettingsAction::Delete, self.group_id().clone(), result.as_ref().map(|_| 0));
        result
    }

    /// Returns the collaborators consulted before an operation.
    fn guard(&self) -> TransferGuard<'_> {
        TransferGuard {
            authorizer: self.authorizer.as_ref(),
            tokens: self.tokens.as_ref(),
        }
    }

    /// Records one audit event for an operation result.
    fn record(&self, action: SettingsAction, group_id: GroupId, result: Result<usize, &SettingsError>) {
        let event = match result {
            Ok(key_count) => SettingsAuditEvent::new(group_id, action, AuditOutcome::Ok, None, key_count),
            Err(err) => SettingsAuditEvent::new(group_id, action, AuditOutcome::Rejected, Some(err.to_string()), 0),
        };
        self.audit.record(&event);
    }
}
