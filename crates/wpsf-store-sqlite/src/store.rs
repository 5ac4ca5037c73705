// crates/wpsf-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Option Store
// Description: Durable OptionStore backed by SQLite WAL.
// Purpose: Persist named settings documents with integrity digests.
// Dependencies: wpsf-core, rusqlite, serde, serde_json, sha2, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`OptionStore`] using `SQLite`. Every
//! write stores the JSON bytes of the document exactly as serialized together
//! with their SHA-256 digest inside a single transaction. Reads check the size limit
//! before loading bytes, then verify the digest and fail closed on mismatch.
//! Security posture: database contents are untrusted.

// ============================================================================//
// SECTION: Imports
// ============================================================================//

use std::fmt::Write as _;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;
use wpsf_core::OptionStore;
use wpsf_core::StoreError;

// ============================================================================//
// SECTION: Constants
// ============================================================================//

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum option name length, matching the host options table column.
const MAX_OPTION_NAME_LENGTH: usize = 191;
/// Default maximum size of one stored document.
pub const MAX_VALUE_BYTES: usize = 1024 * 1024;

// ============================================================================//
// SECTION: Config
// ============================================================================//

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` option store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Maximum serialized size of one stored document in bytes.
    #[serde(default = "default_max_value_bytes")]
    pub max_value_bytes: usize,
}

impl SqliteStoreConfig {
    /// Builds a config for `path` with default tuning.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            max_value_bytes: MAX_VALUE_BYTES,
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default document size limit.
const fn default_max_value_bytes() -> usize {
    MAX_VALUE_BYTES
}

// ============================================================================//
// SECTION: Errors
// ============================================================================//

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store corruption or digest mismatch.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Document exceeded configured size limits.
    #[error("sqlite store payload too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Invalid(format!(
                "value_json exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
        }
    }
}

// ============================================================================//
// SECTION: Store
// ============================================================================//

/// `SQLite`-backed option store with WAL support.
#[derive(Clone)]
pub struct SqliteOptionStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteOptionStore {
    /// Opens an `SQLite`-backed option store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        if config.max_value_bytes == 0 {
            return Err(SqliteStoreError::Invalid(
                "max_value_bytes must be greater than zero".to_string(),
            ));
        }
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Lists stored option names in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn names(&self) -> Result<Vec<String>, SqliteStoreError> {
        let guard =
            self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
        let mut statement = guard
            .prepare("SELECT name FROM options ORDER BY name")
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let rows = statement
            .query_map(params![], |row| row.get::<_, String>(0))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let mut names = Vec::new();
        for row in rows {
            names.push(row.map_err(|err| SqliteStoreError::Db(err.to_string()))?);
        }
        Ok(names)
    }

    /// Loads the document stored under `name`.
    fn load_value(&self, name: &str) -> Result<Option<Value>, SqliteStoreError> {
        validate_option_name(name)?;
        let row = {
            let mut guard = self
                .connection
                .lock()
                .map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
            let tx = guard.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            let metadata: Option<(i64, String)> = tx
                .query_row(
                    "SELECT length(value_json), value_hash FROM options WHERE name = ?1",
                    params![name],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            let row = if let Some((length, hash)) = metadata {
                let length = usize::try_from(length).map_err(|_| {
                    SqliteStoreError::Invalid(format!("negative value length for option {name}"))
                })?;
                if length > self.config.max_value_bytes {
                    return Err(SqliteStoreError::TooLarge {
                        max_bytes: self.config.max_value_bytes,
                        actual_bytes: length,
                    });
                }
                let bytes: Vec<u8> = tx
                    .query_row(
                        "SELECT value_json FROM options WHERE name = ?1",
                        params![name],
                        |row| row.get(0),
                    )
                    .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
                Some((bytes, hash))
            } else {
                None
            };
            tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            drop(guard);
            row
        };
        let Some((bytes, hash)) = row else {
            return Ok(None);
        };
        if digest_hex(&bytes) != hash {
            return Err(SqliteStoreError::Corrupt(format!("hash mismatch for option {name}")));
        }
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        Ok(Some(value))
    }

    /// Replaces the document stored under `name`.
    fn save_value(&self, name: &str, value: &Value) -> Result<(), SqliteStoreError> {
        validate_option_name(name)?;
        let value_json =
            serde_json::to_vec(value).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        if value_json.len() > self.config.max_value_bytes {
            return Err(SqliteStoreError::TooLarge {
                max_bytes: self.config.max_value_bytes,
                actual_bytes: value_json.len(),
            });
        }
        let hash = digest_hex(&value_json);
        let updated_at = unix_millis();
        {
            let mut guard = self
                .connection
                .lock()
                .map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
            let tx = guard.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute(
                "INSERT INTO options (name, value_json, value_hash, updated_at) VALUES (?1, ?2, \
                 ?3, ?4) ON CONFLICT(name) DO UPDATE SET value_json = excluded.value_json, \
                 value_hash = excluded.value_hash, updated_at = excluded.updated_at",
                params![name, value_json, hash, updated_at],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            drop(guard);
        }
        Ok(())
    }

    /// Removes the document stored under `name`.
    fn delete_value(&self, name: &str) -> Result<(), SqliteStoreError> {
        validate_option_name(name)?;
        let guard =
            self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
        guard
            .execute("DELETE FROM options WHERE name = ?1", params![name])
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        drop(guard);
        Ok(())
    }
}

impl OptionStore for SqliteOptionStore {
    fn get(&self, name: &str) -> Result<Option<Value>, StoreError> {
        self.load_value(name).map_err(StoreError::from)
    }

    fn set(&self, name: &str, value: &Value) -> Result<(), StoreError> {
        self.save_value(name, value).map_err(StoreError::from)
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.delete_value(name).map_err(StoreError::from)
    }
}

// ============================================================================//
// SECTION: Helpers
// ============================================================================//

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Rejects option names the options table cannot hold.
fn validate_option_name(name: &str) -> Result<(), SqliteStoreError> {
    if name.is_empty() {
        return Err(SqliteStoreError::Invalid("option name must not be empty".to_string()));
    }
    if name.len() > MAX_OPTION_NAME_LENGTH {
        return Err(SqliteStoreError::Invalid(format!(
            "option name exceeds {MAX_OPTION_NAME_LENGTH} bytes"
        )));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS options (
                    name TEXT PRIMARY KEY,
                    value_json BLOB NOT NULL,
                    value_hash TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                );",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Returns the lowercase hex SHA-256 digest of `bytes`.
fn digest_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
