// crates/wpsf-config/src/config.rs
// ============================================================================
// Module: WPSF Configuration
// Description: Configuration loading and validation for one settings instance.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: wpsf-core, wpsf-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed. Relative paths inside the
//! file resolve against the directory that holds it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use wpsf_core::RenderOptions;
use wpsf_core::Schema;
use wpsf_core::runtime::DEFAULT_AJAX_URL;
use wpsf_core::runtime::tokens::DEFAULT_TOKEN_TTL;
use wpsf_store_sqlite::SqliteStoreConfig;

use crate::schema_source::load_schema_source;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "wpsf.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "WPSF_CONFIG";
/// Maximum configuration or schema file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum token lifetime in seconds.
pub(crate) const MAX_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;
/// Maximum length of the AJAX endpoint URL.
pub(crate) const MAX_AJAX_URL_LENGTH: usize = 2048;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Settings instance configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WpsfConfig {
    /// Schema location and group identity.
    pub settings: SettingsConfig,
    /// Option store selection.
    #[serde(default)]
    pub storage: StorageConfig,
    /// One-time token configuration.
    #[serde(default)]
    pub tokens: TokenConfig,
    /// Audit output configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Form rendering flags.
    #[serde(default)]
    pub render: RenderConfig,
    /// Directory relative paths resolve against (not serialized).
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl WpsfConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        let content = read_text_file(&resolved, "config file")?;
        let mut config = Self::from_toml_str(&content)?;
        config.base_dir = resolved.parent().map(Path::to_path_buf);
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from TOML text without validating it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the text is not valid config TOML.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.settings.validate()?;
        self.storage.validate()?;
        self.tokens.validate()?;
        self.audit.validate()?;
        self.render.validate()?;
        Ok(())
    }

    /// Resolves a configured path against the config file directory.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Returns the resolved schema source path.
    #[must_use]
    pub fn schema_path(&self) -> PathBuf {
        self.resolve(Path::new(self.settings.schema_path.trim()))
    }

    /// Returns the resolved `SQLite` store config, if the backend uses one.
    #[must_use]
    pub fn sqlite_store_config(&self) -> Option<SqliteStoreConfig> {
        match (self.storage.backend, &self.storage.sqlite) {
            (StorageBackend::Sqlite, Some(sqlite)) => {
                let mut resolved = sqlite.clone();
                resolved.path = self.resolve(&sqlite.path);
                Some(resolved)
            }
            _ => None,
        }
    }

    /// Returns the resolved audit log path, if one is configured.
    #[must_use]
    pub fn audit_path(&self) -> Option<PathBuf> {
        self.audit.path.as_deref().map(|path| self.resolve(Path::new(path.trim())))
    }

    /// Loads and builds the schema named by `settings.schema_path`.
    ///
    /// A `settings.group_id` fills in a schema without one and must match a
    /// schema that declares its own.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the schema cannot be read, parsed, or
    /// built, or when its group id conflicts with the config.
    pub fn load_schema(&self) -> Result<Schema, ConfigError> {
        let mut source = load_schema_source(&self.schema_path())?;
        if let Some(group_id) = &self.settings.group_id {
            match &source.group_id {
                None => source.group_id = Some(group_id.clone()),
                Some(declared) if declared == group_id => {}
                Some(declared) => {
                    return Err(ConfigError::Invalid(format!(
                        "settings.group_id {group_id} does not match schema group_id {declared}"
                    )));
                }
            }
        }
        Schema::build(source).map_err(|err| ConfigError::Invalid(format!("schema: {err}")))
    }
}

/// Schema location and group identity.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsConfig {
    /// Optional group id; required when the schema file does not declare one.
    #[serde(default)]
    pub group_id: Option<String>,
    /// Path to the schema source (`.json` or `.toml`).
    pub schema_path: String,
}

impl SettingsConfig {
    /// Validates schema location settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("settings.schema_path", &self.schema_path)?;
        if let Some(group_id) = &self.group_id {
            if group_id.trim().is_empty() {
                return Err(ConfigError::Invalid("settings.group_id must be non-empty".to_string()));
            }
            if group_id.trim() != group_id {
                return Err(ConfigError::Invalid("settings.group_id must be trimmed".to_string()));
            }
        }
        Ok(())
    }
}

/// Supported option store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Process-local store; contents are lost on exit.
    #[default]
    Memory,
    /// Durable `SQLite` store.
    Sqlite,
}

/// Option store selection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// Selected backend.
    #[serde(default)]
    pub backend: StorageBackend,
    /// `SQLite` store settings, required for the `sqlite` backend.
    #[serde(default)]
    pub sqlite: Option<SqliteStoreConfig>,
}

impl StorageConfig {
    /// Validates backend selection.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.backend, &self.sqlite) {
            (StorageBackend::Sqlite, None) => Err(ConfigError::Invalid(
                "storage.sqlite must be set when storage.backend is sqlite".to_string(),
            )),
            (StorageBackend::Sqlite, Some(sqlite)) => {
                validate_path_string("storage.sqlite.path", &sqlite.path.to_string_lossy())?;
                if sqlite.max_value_bytes == 0 {
                    return Err(ConfigError::Invalid(
                        "storage.sqlite.max_value_bytes must be greater than zero".to_string(),
                    ));
                }
                Ok(())
            }
            (StorageBackend::Memory, _) => Ok(()),
        }
    }
}

/// One-time token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    /// Token lifetime in seconds.
    #[serde(default = "default_token_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_token_ttl_secs(),
        }
    }
}

impl TokenConfig {
    /// Returns the token lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Validates token lifetime bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl_secs == 0 {
            return Err(ConfigError::Invalid("tokens.ttl_secs must be greater than zero".to_string()));
        }
        if self.ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(ConfigError::Invalid(format!(
                "tokens.ttl_secs must be at most {MAX_TOKEN_TTL_SECS}"
            )));
        }
        Ok(())
    }
}

/// Audit output configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when absent.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        Ok(())
    }
}

/// Form rendering flags.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    /// Endpoint the export/import controls post to.
    #[serde(default = "default_ajax_url")]
    pub ajax_url: String,
    /// Render the submit button.
    #[serde(default = "default_true")]
    pub show_save_button: bool,
    /// Render tab navigation.
    #[serde(default = "default_true")]
    pub show_tab_links: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            ajax_url: default_ajax_url(),
            show_save_button: true,
            show_tab_links: true,
        }
    }
}

impl RenderConfig {
    /// Returns the renderer options these flags select.
    #[must_use]
    pub const fn render_options(&self) -> RenderOptions {
        RenderOptions {
            show_save_button: self.show_save_button,
            show_tab_links: self.show_tab_links,
        }
    }

    /// Validates render settings.
    fn validate(&self) -> Result<(), ConfigError> {
        let trimmed = self.ajax_url.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::Invalid("render.ajax_url must be non-empty".to_string()));
        }
        if trimmed.len() > MAX_AJAX_URL_LENGTH {
            return Err(ConfigError::Invalid("render.ajax_url exceeds max length".to_string()));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(ConfigError::Invalid(
                "render.ajax_url must not contain control characters".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML or JSON parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates a resolved path against security limits.
pub(crate) fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    let path = Path::new(trimmed);
    for component in path.components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Reads a bounded UTF-8 text file.
pub(crate) fn read_text_file(path: &Path, label: &str) -> Result<String, ConfigError> {
    validate_path(path)?;
    let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
    if bytes.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::Invalid(format!("{label} exceeds size limit")));
    }
    String::from_utf8(bytes).map_err(|_| ConfigError::Invalid(format!("{label} must be utf-8")))
}

/// Default audit logging enabled.
const fn default_audit_enabled() -> bool {
    true
}

/// Default token lifetime in seconds.
const fn default_token_ttl_secs() -> u64 {
    DEFAULT_TOKEN_TTL.as_secs()
}

/// Default AJAX endpoint.
fn default_ajax_url() -> String {
    DEFAULT_AJAX_URL.to_string()
}

/// Serde helper for flags that default on.
const fn default_true() -> bool {
    true
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use super::*;

    #[test]
    fn token_config_rejects_zero_and_overlong_ttl() {
        assert!(TokenConfig { ttl_secs: 0 }.validate().is_err());
        assert!(TokenConfig { ttl_secs: MAX_TOKEN_TTL_SECS + 1 }.validate().is_err());
        assert!(TokenConfig::default().validate().is_ok());
        assert_eq!(TokenConfig::default().ttl(), DEFAULT_TOKEN_TTL);
    }

    #[test]
    fn render_config_rejects_control_characters() {
        let config = RenderConfig {
            ajax_url: "admin-ajax.php\n".to_string(),
            ..RenderConfig::default()
        };
        assert!(config.validate().is_ok(), "trailing whitespace is trimmed");
        let config = RenderConfig {
            ajax_url: "admin\u{7}ajax.php".to_string(),
            ..RenderConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_path_string_rejects_long_components() {
        let long = "a".repeat(MAX_PATH_COMPONENT_LENGTH + 1);
        assert!(validate_path_string("field", &long).is_err());
        assert!(validate_path_string("field", "  ").is_err());
        assert!(validate_path_string("field", "dir/file.json").is_ok());
    }

    #[test]
    fn resolve_joins_relative_paths_to_base_dir() {
        let mut config =
            WpsfConfig::from_toml_str("[settings]\nschema_path = \"schema.json\"\n").unwrap();
        assert_eq!(config.schema_path(), PathBuf::from("schema.json"));
        config.base_dir = Some(PathBuf::from("/etc/wpsf"));
        assert_eq!(config.schema_path(), PathBuf::from("/etc/wpsf/schema.json"));
        assert_eq!(config.resolve(Path::new("/abs/db.sqlite")), PathBuf::from("/abs/db.sqlite"));
    }
}
