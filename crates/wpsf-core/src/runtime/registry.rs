// crates/wpsf-core/src/runtime/registry.rs
// ============================================================================
// Module: WPSF Field Registry
// Description: Type-tag dispatch from field types to rendering strategies.
// Purpose: Resolve strategies explicitly and keep the registry open to hosts.
// Dependencies: crate::core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The registry maps a field `type` to a [`FieldStrategy`]. Hosts register
//! extra strategies (or replace built-ins) at startup. Resolving an unknown
//! type yields [`RegistryError::NotFound`]; the render path treats that as
//! "render nothing" rather than a failure.
//!
//! The `custom` field type looks up host-registered [`CustomOutput`]
//! capabilities by name instead of resolving callables at runtime.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::core::Field;
use crate::core::GroupId;
use crate::core::values::display_text;
use crate::runtime::fields::register_builtins;

// ============================================================================
// SECTION: Render Environment
// ============================================================================

/// Page-level values strategies may need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderEnv {
    /// Group being rendered.
    pub group_id: GroupId,
    /// Endpoint receiving export downloads and import uploads.
    pub ajax_url: String,
    /// One-time token for the export link.
    pub export_token: Option<String>,
    /// One-time token for the import form.
    pub import_token: Option<String>,
}

impl RenderEnv {
    /// Creates an environment without tokens.
    #[must_use]
    pub fn new(group_id: GroupId, ajax_url: impl Into<String>) -> Self {
        Self {
            group_id,
            ajax_url: ajax_url.into(),
            export_token: None,
            import_token: None,
        }
    }
}

// ============================================================================
// SECTION: Field Context
// ============================================================================

/// Everything a strategy needs to render one field instance.
///
/// # Invariants
/// - `id` and `name` are already derived; strategies never derive keys.
#[derive(Debug, Clone)]
pub struct FieldContext<'a> {
    /// Page environment.
    pub env: &'a RenderEnv,
    /// Field definition.
    pub field: &'a Field,
    /// Element id (derived key, or group sub-id).
    pub id: String,
    /// Input name.
    pub name: String,
    /// Effective value to display.
    pub value: Value,
    /// CSS classes, including visibility classes for top-level fields.
    pub class: String,
}

impl FieldContext<'_> {
    /// Returns the value as display text.
    #[must_use]
    pub fn value_text(&self) -> String {
        display_text(&self.value)
    }

    /// Returns the value's elements as display text (scalars become one item).
    #[must_use]
    pub fn value_items(&self) -> Vec<String> {
        match &self.value {
            Value::Array(items) => items.iter().map(display_text).collect(),
            Value::Object(entries) => entries.values().map(display_text).collect(),
            Value::Null => Vec::new(),
            scalar => vec![display_text(scalar)],
        }
    }
}

// ============================================================================
// SECTION: Strategies
// ============================================================================

/// Renders one field type.
pub trait FieldStrategy {
    /// Renders markup for the field. Recursive strategies dispatch subfields
    /// through `registry`.
    fn render(&self, ctx: &FieldContext<'_>, registry: &FieldRegistry) -> String;
}

impl<F> FieldStrategy for F
where
    F: Fn(&FieldContext<'_>, &FieldRegistry) -> String,
{
    fn render(&self, ctx: &FieldContext<'_>, registry: &FieldRegistry) -> String {
        self(ctx, registry)
    }
}

/// Host-supplied output for `custom` fields.
pub trait CustomOutput {
    /// Produces markup, or an error message rendered in its place.
    ///
    /// # Errors
    ///
    /// Returns a message when the output cannot be produced.
    fn render(&self, ctx: &FieldContext<'_>) -> Result<String, String>;
}

impl<F> CustomOutput for F
where
    F: Fn(&FieldContext<'_>) -> Result<String, String>,
{
    fn render(&self, ctx: &FieldContext<'_>) -> Result<String, String> {
        self(ctx)
    }
}

/// Registry lookup errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No strategy is registered for the type.
    #[error("no field strategy registered for type {field_type}")]
    NotFound {
        /// Requested type tag.
        field_type: String,
    },
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Field strategy registry.
///
/// # Invariants
/// - Type tags are unique; registering an existing tag replaces it.
#[derive(Default)]
pub struct FieldRegistry {
    /// Strategies keyed by type tag.
    strategies: BTreeMap<String, Box<dyn FieldStrategy>>,
    /// Custom outputs keyed by name.
    custom_outputs: BTreeMap<String, Box<dyn CustomOutput>>,
}

impl FieldRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            strategies: BTreeMap::new(),
            custom_outputs: BTreeMap::new(),
        }
    }

    /// Creates a registry with every built-in strategy registered.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        register_builtins(&mut registry);
        registry
    }

    /// Registers a strategy, returning the one it replaced.
    pub fn register(
        &mut self,
        field_type: impl Into<String>,
        strategy: impl FieldStrategy + 'static,
    ) -> Option<Box<dyn FieldStrategy>> {
        self.strategies.insert(field_type.into(), Box::new(strategy))
    }

    /// Registers a named custom output.
    pub fn register_custom_output(
        &mut self,
        name: impl Into<String>,
        output: impl CustomOutput + 'static,
    ) {
        self.custom_outputs.insert(name.into(), Box::new(output));
    }

    /// Resolves the strategy for a type tag.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for unregistered types.
    pub fn resolve(&self, field_type: &str) -> Result<&dyn FieldStrategy, RegistryError> {
        self.strategies.get(field_type).map(AsRef::as_ref).ok_or_else(|| RegistryError::NotFound {
            field_type: field_type.to_string(),
        })
    }

    /// Returns a named custom output.
    #[must_use]
    pub fn custom_output(&self, name: &str) -> Option<&dyn CustomOutput> {
        self.custom_outputs.get(name).map(AsRef::as_ref)
    }

    /// Returns true when a strategy is registered for the type.
    #[must_use]
    pub fn contains(&self, field_type: &str) -> bool {
        self.strategies.contains_key(field_type)
    }

    /// Renders a field through its strategy; unknown types render nothing.
    #[must_use]
    pub fn render(&self, ctx: &FieldContext<'_>) -> String {
        self.resolve(&ctx.field.field_type).map_or_else(|_| String::new(), |strategy| strategy.render(ctx, self))
    }
}
