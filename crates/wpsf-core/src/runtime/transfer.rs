// crates/wpsf-core/src/runtime/transfer.rs
// ============================================================================
// Module: WPSF Import/Export Pipeline
// Description: Whole-document export and import of persisted settings.
// Purpose: Dump and restore a group's settings as one JSON object.
// Dependencies: crate::{core, interfaces, runtime::store}, serde_json
// ============================================================================

//! ## Overview
//! Export is a raw dump of the persisted document as a compact JSON object
//! with top-level keys in sorted order; nested objects keep their stored
//! order. Numbers are written as stored (`1.0` stays a
//! float), so importing an export restores the same value map. No schema
//! validation runs in either direction: unknown or
//! stale keys survive an import verbatim. Import replaces the whole document
//! in one store call.
//!
//! Checks run in a fixed order and stop at the first failure:
//! - export: authorization, then the export token.
//! - import: authorization, group match, import token, then the payload must
//!   parse as a JSON object.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::core::GroupId;
use crate::core::SettingsMap;
use crate::core::option_name;
use crate::core::values::settings_from_value;
use crate::interfaces::AccessRequest;
use crate::interfaces::Authorizer;
use crate::interfaces::OptionStore;
use crate::interfaces::SettingsAction;
use crate::interfaces::TokenAction;
use crate::interfaces::TokenError;
use crate::interfaces::TokenService;
use crate::runtime::store::SettingsError;
use crate::runtime::store::SettingsStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Content type of export documents.
pub const EXPORT_CONTENT_TYPE: &str = "text/json; charset=utf-8";

/// Maximum accepted import payload size in bytes.
pub const MAX_IMPORT_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Requests and Documents
// ============================================================================

/// Export request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    /// One-time export token.
    pub token: Option<String>,
    /// Group to export.
    pub group_id: GroupId,
}

/// Import request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    /// One-time import token.
    pub token: Option<String>,
    /// Group the document is meant for.
    pub group_id: GroupId,
    /// JSON-encoded settings object.
    pub settings: String,
}

/// Export download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    /// Download file name (`wpsf-settings-{group}.json`).
    pub filename: String,
    /// Response content type.
    pub content_type: &'static str,
    /// Canonical JSON body.
    pub body: Vec<u8>,
    /// Number of top-level keys in the body.
    pub key_count: usize,
}

/// Collaborators consulted before a transfer runs.
#[derive(Clone, Copy)]
pub struct TransferGuard<'a> {
    /// Authorization check.
    pub authorizer: &'a dyn Authorizer,
    /// One-time token verification.
    pub tokens: &'a dyn TokenService,
}

// ============================================================================
// SECTION: Encoding
// ============================================================================

/// Returns the export file name for a group.
#[must_use]
pub fn export_filename(group_id: &GroupId) -> String {
    format!("wpsf-settings-{group_id}.json")
}

/// Encodes settings as compact JSON with sorted keys; an empty map encodes
/// as `{}`.
///
/// # Errors
///
/// Returns [`SettingsError::Serialization`] when encoding fails.
pub fn encode_settings(settings: &SettingsMap) -> Result<Vec<u8>, SettingsError> {
    serde_json::to_vec(settings).map_err(|err| SettingsError::Serialization(err.to_string()))
}

/// Parses an import payload, which must be a JSON object.
///
/// # Errors
///
/// Returns [`SettingsError::InvalidFormat`] for oversized payloads, invalid
/// JSON, or JSON that is not an object.
pub fn parse_settings_document(input: &str) -> Result<SettingsMap, SettingsError> {
    if input.len() > MAX_IMPORT_BYTES {
        return Err(SettingsError::InvalidFormat("settings document exceeds size limit".to_string()));
    }
    let value: Value = serde_json::from_str(input)
        .map_err(|err| SettingsError::InvalidFormat(format!("settings document is not valid json: {err}")))?;
    settings_from_value(value)
        .ok_or_else(|| SettingsError::InvalidFormat("settings document must be a json object".to_string()))
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Exports the persisted document of the requested group.
///
/// The requested group does not have to be the store's group; another
/// group's record is read from the same option store.
///
/// # Errors
///
/// Returns [`SettingsError::Forbidden`] when authorization or the token
/// check fails, and store or serialization errors otherwise.
pub fn export_settings<S>(
    store: &SettingsStore<S>,
    guard: TransferGuard<'_>,
    request: &ExportRequest,
) -> Result<ExportDocument, SettingsError>
where
    S: OptionStore,
{
    authorize(guard, SettingsAction::Export, &request.group_id)?;
    verify_token(guard, TokenAction::Export, request.token.as_deref())?;
    let settings = if request.group_id == *store.group_id() {
        store.persisted()?
    } else {
        store
            .options()
            .get(&option_name(&request.group_id))?
            .and_then(settings_from_value)
            .unwrap_or_default()
    };
    Ok(ExportDocument {
        filename: export_filename(&request.group_id),
        content_type: EXPORT_CONTENT_TYPE,
        body: encode_settings(&settings)?,
        key_count: settings.len(),
    })
}

/// Imports a document, replacing the store's whole persisted document.
///
/// Returns the number of keys written.
///
/// # Errors
///
/// Returns [`SettingsError::Forbidden`] for authorization, group, or token
/// failures, [`SettingsError::InvalidFormat`] for a bad payload, and store
/// errors otherwise. Nothing is written on error.
pub fn import_settings<S>(
    store: &mut SettingsStore<S>,
    guard: TransferGuard<'_>,
    request: &ImportRequest,
) -> Result<usize, SettingsError>
where
    S: OptionStore,
{
    authorize(guard, SettingsAction::Import, store.group_id())?;
    if request.group_id != *store.group_id() {
        return Err(SettingsError::Forbidden("group mismatch".to_string()));
    }
    verify_token(guard, TokenAction::Import, request.token.as_deref())?;
    let settings = parse_settings_document(&request.settings)?;
    store.replace_persisted(&settings)?;
    Ok(settings.len())
}

/// Runs the authorization check for one action.
///
/// # Errors
///
/// Returns [`SettingsError::Forbidden`] with the authorizer's reason.
pub fn authorize(guard: TransferGuard<'_>, action: SettingsAction, group_id: &GroupId) -> Result<(), SettingsError> {
    let decision = guard.authorizer.authorize(AccessRequest {
        action,
        group_id,
    });
    if decision.allowed { Ok(()) } else { Err(SettingsError::Forbidden(decision.reason)) }
}

/// Verifies and consumes a one-time token.
fn verify_token(guard: TransferGuard<'_>, action: TokenAction, token: Option<&str>) -> Result<(), SettingsError> {
    let token = token.unwrap_or_default();
    guard.tokens.verify(action, token).map_err(|err| match err {
        TokenError::Rejected => SettingsError::Forbidden(format!("invalid {} token", action.as_str())),
        TokenError::Service(message) => SettingsError::Forbidden(format!("token service error: {message}")),
    })
}
