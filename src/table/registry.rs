//! Table registry
//!
//! One registry per worker, keyed by table name. The worker task is the only
//! mutator, so no interior locking is needed.

use std::collections::HashMap;

use super::errors::{TableError, TableResult};
use super::table::MemoryTable;

/// Registry of live tables, keyed by name
#[derive(Debug, Default)]
pub struct TableRegistry {
    tables: HashMap<String, MemoryTable>,
}

impl TableRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table. Fails with `AlreadyExists` and no mutation when the
    /// name is taken.
    pub fn create(&mut self, name: &str, item_type: Option<String>) -> TableResult<()> {
        if self.tables.contains_key(name) {
            return Err(TableError::AlreadyExists(name.to_string()));
        }
        self.tables
            .insert(name.to_string(), MemoryTable::new(name, item_type));
        Ok(())
    }

    /// Drop a table, releasing its records. Fails with `NotFound` when absent.
    pub fn drop(&mut self, name: &str) -> TableResult<()> {
        if self.tables.remove(name).is_none() {
            return Err(TableError::NotFound(name.to_string()));
        }
        Ok(())
    }

    /// Immutable access to a table
    pub fn get(&self, name: &str) -> TableResult<&MemoryTable> {
        self.tables
            .get(name)
            .ok_or_else(|| TableError::NotFound(name.to_string()))
    }

    /// Mutable access to a table
    pub fn get_mut(&mut self, name: &str) -> TableResult<&mut MemoryTable> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| TableError::NotFound(name.to_string()))
    }

    /// True when a table with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Number of live tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// True when no tables exist
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
