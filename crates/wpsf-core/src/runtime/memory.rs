// crates/wpsf-core/src/runtime/memory.rs
// ============================================================================
// Module: WPSF In-Memory Option Store
// Description: Simple in-memory option store for tests and single-run tools.
// Purpose: Provide a deterministic OptionStore without external dependencies.
// Dependencies: crate::interfaces, serde_json
// ============================================================================

//! ## Overview
//! This module provides an in-memory implementation of [`OptionStore`].
//! Clones share the same underlying map, so a test can keep a handle while an
//! engine owns another.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use serde_json::Value;

use crate::interfaces::OptionStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory option store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryOptionStore {
    /// Option records protected by a mutex.
    records: Arc<Mutex<BTreeMap<String, Value>>>,
}

impl InMemoryOptionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Returns the number of stored records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store lock is poisoned.
    pub fn len(&self) -> Result<usize, StoreError> {
        let guard = self.lock()?;
        Ok(guard.len())
    }

    /// Returns true when no records are stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Locks the record map.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Value>>, StoreError> {
        self.records.lock().map_err(|_| StoreError::Store("option store mutex poisoned".to_string()))
    }
}

impl OptionStore for InMemoryOptionStore {
    fn get(&self, name: &str) -> Result<Option<Value>, StoreError> {
        let guard = self.lock()?;
        Ok(guard.get(name).cloned())
    }

    fn set(&self, name: &str, value: &Value) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        guard.insert(name.to_string(), value.clone());
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        guard.remove(name);
        Ok(())
    }
}
