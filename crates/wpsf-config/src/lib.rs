// crates/wpsf-config/src/lib.rs
// ============================================================================
// Module: WPSF Config Library
// Description: Configuration model, validation, and schema-source loading.
// Purpose: Single source of truth for wpsf.toml semantics.
// Dependencies: wpsf-core, wpsf-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `wpsf-config` defines the configuration for one settings instance: where
//! its schema lives, which option store backs it, token lifetime, audit
//! output, and render flags. Loading is strict and fails closed.
//!
//! Security posture: config and schema files are untrusted input.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod schema_source;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use schema_source::load_schema_source;
