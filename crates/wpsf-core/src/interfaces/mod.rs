// crates/wpsf-core/src/interfaces/mod.rs
// ============================================================================
// Module: WPSF Interfaces
// Description: Collaborator seams for persistence, authorization, tokens, and validation.
// Purpose: Define the contracts the settings engine consumes from its host.
// Dependencies: crate::core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The engine never talks to a host framework directly. Persistence,
//! authorization, one-time tokens, and final input validation are supplied
//! through the traits in this module. Implementations must fail closed: an
//! error from any collaborator aborts the operation without a partial write.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use thiserror::Error;

use crate::core::GroupId;
use crate::core::SettingsMap;

// ============================================================================
// SECTION: Option Store
// ============================================================================

/// Option store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("option store io error: {0}")]
    Io(String),
    /// Stored data is corrupted or fails integrity checks.
    #[error("option store corruption: {0}")]
    Corrupt(String),
    /// Stored data version is incompatible.
    #[error("option store version mismatch: {0}")]
    VersionMismatch(String),
    /// Data rejected by the store.
    #[error("option store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("option store error: {0}")]
    Store(String),
}

/// Key-value persistence provider for settings documents.
///
/// Each call is atomic: `set` replaces the whole record or changes nothing.
pub trait OptionStore {
    /// Loads a record by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn get(&self, name: &str) -> Result<Option<Value>, StoreError>;

    /// Replaces a record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when saving fails.
    fn set(&self, name: &str, value: &Value) -> Result<(), StoreError>;

    /// Deletes a record; deleting a missing record succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when deletion fails.
    fn delete(&self, name: &str) -> Result<(), StoreError>;
}

impl<T> OptionStore for Box<T>
where
    T: OptionStore + ?Sized,
{
    fn get(&self, name: &str) -> Result<Option<Value>, StoreError> {
        (**self).get(name)
    }

    fn set(&self, name: &str, value: &Value) -> Result<(), StoreError> {
        (**self).set(name, value)
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        (**self).delete(name)
    }
}

// ============================================================================
// SECTION: Authorization
// ============================================================================

/// Settings action being authorized or audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsAction {
    /// Render the settings page.
    Render,
    /// Persist submitted settings.
    Save,
    /// Export the settings document.
    Export,
    /// Import a settings document.
    Import,
    /// Delete the settings record.
    Delete,
}

impl SettingsAction {
    /// Returns the stable label for this action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Render => "render",
            Self::Save => "save",
            Self::Export => "export",
            Self::Import => "import",
            Self::Delete => "delete",
        }
    }
}

/// Authorization request context.
///
/// # Invariants
/// - This is a pure request container; values are checked by the authorizer.
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    /// Action being authorized.
    pub action: SettingsAction,
    /// Group the action targets.
    pub group_id: &'a GroupId,
}

/// Authorization decision outcome.
///
/// # Invariants
/// - `allowed` is the authoritative decision for the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthzDecision {
    /// Whether access is allowed.
    pub allowed: bool,
    /// Reason label for audit logs.
    pub reason: String,
}

/// Authorization interface gating the settings UI and transfer actions.
pub trait Authorizer {
    /// Authorizes one action.
    fn authorize(&self, request: AccessRequest<'_>) -> AuthzDecision;
}

/// Authorizer that allows every action.
///
/// # Invariants
/// - Always returns an allow decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllAuthorizer;

impl Authorizer for AllowAllAuthorizer {
    fn authorize(&self, _request: AccessRequest<'_>) -> AuthzDecision {
        AuthzDecision {
            allowed: true,
            reason: "allow_all".to_string(),
        }
    }
}

// ============================================================================
// SECTION: One-Time Tokens
// ============================================================================

/// Action a one-time token is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenAction {
    /// Export download.
    Export,
    /// Import upload.
    Import,
}

impl TokenAction {
    /// Returns the stable label for this action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Export => "export",
            Self::Import => "import",
        }
    }
}

/// One-time token errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Token is missing, unknown, expired, already used, or bound to another action.
    #[error("token rejected")]
    Rejected,
    /// Token service failed.
    #[error("token service error: {0}")]
    Service(String),
}

/// Issues and verifies single-use, action-bound tokens.
pub trait TokenService {
    /// Issues a fresh token for an action.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Service`] when issuance fails.
    fn issue(&self, action: TokenAction) -> Result<String, TokenError>;

    /// Verifies and consumes a token.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] when the token is not valid for the action.
    fn verify(&self, action: TokenAction, token: &str) -> Result<(), TokenError>;
}

// ============================================================================
// SECTION: Validation Hook
// ============================================================================

/// Rejection returned by a validation hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRejection {
    /// Reason label (never contains submitted values).
    pub reason: String,
}

impl ValidationRejection {
    /// Creates a rejection with a reason label.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Final validation pass over submitted input before persistence.
///
/// A hook may transform the input or reject it as a whole.
pub trait ValidationHook {
    /// Validates submitted input.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationRejection`] to abort persistence.
    fn validate(&self, input: SettingsMap) -> Result<SettingsMap, ValidationRejection>;
}

impl<F> ValidationHook for F
where
    F: Fn(SettingsMap) -> Result<SettingsMap, ValidationRejection>,
{
    fn validate(&self, input: SettingsMap) -> Result<SettingsMap, ValidationRejection> {
        self(input)
    }
}

/// Validation hook that returns input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughValidation;

impl ValidationHook for PassThroughValidation {
    fn validate(&self, input: SettingsMap) -> Result<SettingsMap, ValidationRejection> {
        Ok(input)
    }
}
