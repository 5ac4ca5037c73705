// crates/wpsf-core/src/runtime/store.rs
// ============================================================================
// Module: WPSF Settings Store
// Description: Effective settings resolution, memoization, and persistence.
// Purpose: Layer schema defaults under persisted values and write whole documents.
// Dependencies: crate::{core, interfaces}, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`SettingsStore`] owns the persisted settings document of one group. The
//! effective value of a field is its persisted value when present and not
//! null, else its declared default (objects normalized to arrays of their
//! values), else `false`.
//!
//! Resolution is memoized for the lifetime of the store. The cache is keyed
//! on the group id, holds the persisted, prefixed, and unprefixed views
//! together, and is dropped by every write. A store is meant to live for one
//! request or one CLI invocation.
//!
//! The unprefixed view collapses keys to bare field ids. Two fields sharing
//! an id in different sections collapse to one entry, and the field later in
//! render order wins.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::core::GroupId;
use crate::core::KeyModeError;
use crate::core::Schema;
use crate::core::SettingsMap;
use crate::core::keys::option_name;
use crate::core::values::is_empty_value;
use crate::core::values::normalize_default;
use crate::core::values::settings_from_value;
use crate::core::values::settings_to_value;
use crate::interfaces::OptionStore;
use crate::interfaces::PassThroughValidation;
use crate::interfaces::StoreError;
use crate::interfaces::TokenError;
use crate::interfaces::ValidationHook;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Settings operation errors. Every error leaves stored values unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// Authorization, group match, or token check failed.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Submitted document is not a JSON object.
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    /// Validation hook rejected the input.
    #[error("validation failed: {0}")]
    ValidationFailed(String),
    /// Lookup used the wrong key mode for the schema.
    #[error("key mode mismatch: {0}")]
    KeyModeMismatch(#[from] KeyModeError),
    /// Persistence provider failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Token service failed to issue a token.
    #[error(transparent)]
    Token(#[from] TokenError),
    /// Encoding the settings document failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

// ============================================================================
// SECTION: Resolved Settings
// ============================================================================

/// Memoized views of one group's settings.
#[derive(Debug, Clone, PartialEq)]
struct ResolvedSettings {
    /// Group the views were resolved for.
    group_id: GroupId,
    /// Raw persisted document.
    persisted: SettingsMap,
    /// Effective values keyed by derived key.
    prefixed: SettingsMap,
    /// Effective values keyed by bare field id.
    unprefixed: SettingsMap,
}

/// Resolves effective values for every schema field.
fn resolve_settings(schema: &Schema, persisted: SettingsMap) -> ResolvedSettings {
    let mut prefixed = SettingsMap::new();
    let mut unprefixed = SettingsMap::new();
    for entry in schema.field_entries() {
        let value = match persisted.get(entry.key.as_str()) {
            Some(stored) if !stored.is_null() => stored.clone(),
            _ => entry.field.default.clone().map_or(Value::Bool(false), normalize_default),
        };
        unprefixed.insert(entry.field.id.to_string(), value.clone());
        prefixed.insert(entry.key.to_string(), value);
    }
    ResolvedSettings {
        group_id: schema.group_id().clone(),
        persisted,
        prefixed,
        unprefixed,
    }
}

// ============================================================================
// SECTION: Settings Store
// ============================================================================

/// Settings store for one group.
///
/// # Invariants
/// - Every write replaces the whole persisted document and drops the cache.
/// - A failed write leaves the persisted document and the cache unchanged.
pub struct SettingsStore<S> {
    /// Schema shared with the engine.
    schema: Arc<Schema>,
    /// Persistence provider.
    options: S,
    /// Final validation pass for submitted input.
    validation: Box<dyn ValidationHook>,
    /// Memoized resolution.
    cache: RefCell<Option<Rc<ResolvedSettings>>>,
}

impl<S> SettingsStore<S>
where
    S: OptionStore,
{
    /// Creates a store with a pass-through validation hook.
    #[must_use]
    pub fn new(schema: Arc<Schema>, options: S) -> Self {
        Self {
            schema,
            options,
            validation: Box::new(PassThroughValidation),
            cache: RefCell::new(None),
        }
    }

    /// Replaces the validation hook.
    #[must_use]
    pub fn with_validation_hook<H>(mut self, hook: H) -> Self
    where
        H: ValidationHook + 'static,
    {
        self.validation = Box::new(hook);
        self
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the group id.
    #[must_use]
    pub fn group_id(&self) -> &GroupId {
        self.schema.group_id()
    }

    /// Returns the persistence provider.
    #[must_use]
    pub const fn options(&self) -> &S {
        &self.options
    }

    /// Returns the persisted record name (`{group}_settings`).
    #[must_use]
    pub fn option_name(&self) -> String {
        option_name(self.schema.group_id())
    }

    /// Returns the raw persisted document.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Store`] when loading fails.
    pub fn persisted(&self) -> Result<SettingsMap, SettingsError> {
        Ok(self.resolved()?.persisted.clone())
    }

    /// Returns effective values keyed by derived key, or by bare field id
    /// when `unprefixed` is set.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Store`] when loading fails.
    pub fn read(&self, unprefixed: bool) -> Result<SettingsMap, SettingsError> {
        let resolved = self.resolved()?;
        Ok(if unprefixed { resolved.unprefixed.clone() } else { resolved.prefixed.clone() })
    }

    /// Returns the raw persisted value of one field, or `false` when absent.
    ///
    /// Defaults are not applied. The tab argument must agree with the
    /// schema's key mode.
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
        let key = self.schema.key_mode().derive(tab_id, section_id, field_id)?;
        let resolved = self.resolved()?;
        Ok(resolved.persisted.get(key.as_str()).cloned().unwrap_or(Value::Bool(false)))
    }

    /// Returns the effective value of a field by bare id, or `default` when
    /// the value is absent or empty.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Store`] when loading fails.
    pub fn get_option(&self, field_id: &str, default: Value) -> Result<Value, SettingsError> {
        let resolved = self.resolved()?;
        Ok(match resolved.unprefixed.get(field_id) {
            Some(value) if !is_empty_value(value) => value.clone(),
            _ => default,
        })
    }

    /// Runs the validation hook over submitted input and persists the result
    /// verbatim as the whole document.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::ValidationFailed`] when the hook rejects the
    /// input and [`SettingsError::Store`] when persisting fails.
    pub fn validate_and_persist(&mut self, input: SettingsMap) -> Result<SettingsMap, SettingsError> {
        let validated = self
            .validation
            .validate(input)
            .map_err(|rejection| SettingsError::ValidationFailed(rejection.reason))?;
        self.replace_persisted(&validated)?;
        Ok(validated)
    }

    /// Replaces the whole persisted document without validation.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Store`] when persisting fails.
    pub fn replace_persisted(&mut self, settings: &SettingsMap) -> Result<(), SettingsError> {
        let name = self.option_name();
        self.options.set(&name, &settings_to_value(settings))?;
        self.invalidate();
        Ok(())
    }

    /// Deletes the persisted document.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Store`] when deletion fails.
    pub fn delete_all(&mut self) -> Result<(), SettingsError> {
        let name = self.option_name();
        self.options.delete(&name)?;
        self.invalidate();
        Ok(())
    }

    /// Drops the memoized resolution.
    pub fn invalidate(&mut self) {
        self.cache.get_mut().take();
    }

    /// Returns the memoized resolution, computing it on first use.
    fn resolved(&self) -> Result<Rc<ResolvedSettings>, SettingsError> {
        if let Some(cached) = self.cache.borrow().as_ref()
            && cached.group_id == *self.schema.group_id()
        {
            return Ok(Rc::clone(cached));
        }
        let persisted = self.load_persisted()?;
        let resolved = Rc::new(resolve_settings(&self.schema, persisted));
        *self.cache.borrow_mut() = Some(Rc::clone(&resolved));
        Ok(resolved)
    }

    /// Loads the persisted document; a missing or non-object record is empty.
    fn load_persisted(&self) -> Result<SettingsMap, SettingsError> {
        let stored = self.options.get(&self.option_name())?;
        Ok(stored.and_then(settings_from_value).unwrap_or_default())
    }
}
