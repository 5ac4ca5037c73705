// crates/wpsf-store-sqlite/src/lib.rs
// ============================================================================
// Module: WPSF SQLite Option Store
// Description: Durable OptionStore backend using SQLite WAL.
// Purpose: Persist settings documents across process restarts.
// Dependencies: wpsf-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`wpsf_core::OptionStore`]. Each named
//! option holds one JSON document plus a digest of its bytes, so a
//! tampered or truncated row is reported instead of silently read back.
//! Security posture: database contents are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::MAX_VALUE_BYTES;
pub use store::SqliteOptionStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
