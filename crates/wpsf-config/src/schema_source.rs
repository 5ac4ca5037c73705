// crates/wpsf-config/src/schema_source.rs
// ============================================================================
// Module: Schema Source Loading
// Description: Reads declarative schema files in JSON or TOML form.
// Purpose: Turn an on-disk schema document into a buildable schema source.
// Dependencies: wpsf-core, serde_json, toml
// ============================================================================

//! ## Overview
//! Schema files are untrusted input and go through the same path, size, and
//! UTF-8 guards as the config file. The format follows the file extension.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use wpsf_core::SchemaSource;

use crate::config::ConfigError;
use crate::config::read_text_file;

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Schema document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchemaFormat {
    /// `.json` document.
    Json,
    /// `.toml` document.
    Toml,
}

impl SchemaFormat {
    /// Selects the format from a file extension.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            _ => Err(ConfigError::Invalid("schema file must end in .json or .toml".to_string())),
        }
    }
}

/// Loads a schema source document from `path`.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file is unreadable, oversized, not UTF-8,
/// has an unsupported extension, or does not parse as a schema source.
pub fn load_schema_source(path: &Path) -> Result<SchemaSource, ConfigError> {
    let format = SchemaFormat::from_path(path)?;
    let content = read_text_file(path, "schema file")?;
    match format {
        SchemaFormat::Json => serde_json::from_str(&content)
            .map_err(|err| ConfigError::Parse(format!("schema json: {err}"))),
        SchemaFormat::Toml => toml::from_str(&content)
            .map_err(|err| ConfigError::Parse(format!("schema toml: {err}"))),
    }
}
