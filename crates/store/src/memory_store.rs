//! In-memory local store implementation.
//!
//! `MemoryStore` keeps both record sets in memory. It is intended for tests
//! and ephemeral runs; nothing survives a restart.

use crate::{LocalStore, RecordSet, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// In-memory implementation of `LocalStore`
///
/// Record sets live in a `HashMap` behind an `RwLock`, so reads can run
/// concurrently while writes are exclusive.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sets: RwLock<HashMap<RecordSet, Vec<Value>>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in a set
    pub fn len(&self, set: RecordSet) -> usize {
        self.sets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&set)
            .map_or(0, Vec::len)
    }

    /// Check whether a set has no records
    pub fn is_empty(&self, set: RecordSet) -> bool {
        self.len(set) == 0
    }
}

impl LocalStore for MemoryStore {
    fn clear(&self, set: RecordSet) -> Result<()> {
        self.sets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&set);
        Ok(())
    }

    fn bulk_insert(&self, set: RecordSet, records: Vec<Value>) -> Result<()> {
        self.sets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(set)
            .or_default()
            .extend(records);
        Ok(())
    }

    fn read_all(&self, set: RecordSet) -> Result<Vec<Value>> {
        Ok(self
            .sets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&set)
            .cloned()
            .unwrap_or_default())
    }

    fn replace(&self, set: RecordSet, records: Vec<Value>) -> Result<()> {
        let mut sets = self.sets.write().unwrap_or_else(PoisonError::into_inner);
        if records.is_empty() {
            sets.remove(&set);
        } else {
            sets.insert(set, records);
        }
        Ok(())
    }
}
