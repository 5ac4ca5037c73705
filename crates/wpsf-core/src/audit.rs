// crates/wpsf-core/src/audit.rs
// ============================================================================
// Module: WPSF Audit Logging
// Description: Structured audit events for settings writes and transfers.
// Purpose: Emit one JSON line per save, import, export, or delete attempt.
// Dependencies: crate::{core, interfaces}, serde, serde_json
// ============================================================================

//! ## Overview
//! Every write-side operation on the engine records exactly one
//! [`SettingsAuditEvent`], whether it succeeds or is rejected. Events carry
//! labels and counts only: setting values and tokens are never logged.
//! Sinks are pluggable; stderr, append-only file, and no-op sinks ship here.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::GroupId;
use crate::interfaces::SettingsAction;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Outcome of an audited operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// Operation completed.
    Ok,
    /// Operation was rejected or failed; nothing was written.
    Rejected,
}

/// Settings audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Settings group.
    pub group_id: GroupId,
    /// Audited action label.
    pub action: &'static str,
    /// Operation outcome.
    pub outcome: AuditOutcome,
    /// Rejection reason when the operation failed.
    pub reason: Option<String>,
    /// Number of keys written or exported.
    pub key_count: usize,
}

impl SettingsAuditEvent {
    /// Creates a new audit event with a consistent timestamp.
    #[must_use]
    pub fn new(
        group_id: GroupId,
        action: SettingsAction,
        outcome: AuditOutcome,
        reason: Option<String>,
        key_count: usize,
    ) -> Self {
        let timestamp_ms = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "settings_audit",
            timestamp_ms,
            group_id,
            action: action.as_str(),
            outcome,
            reason,
            key_count,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for settings events.
pub trait SettingsAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &SettingsAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl SettingsAuditSink for StderrAuditSink {
    fn record(&self, event: &SettingsAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl SettingsAuditSink for FileAuditSink {
    fn record(&self, event: &SettingsAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl SettingsAuditSink for NoopAuditSink {
    fn record(&self, _event: &SettingsAuditEvent) {}
}
