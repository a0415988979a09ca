//! Table snapshots for undo support
//!
//! A [`SaveData`] captures selected rows of one or more tables as plain
//! column-value maps, detached from any live connection. Snapshots are
//! taken before a destructive edit and handed back to
//! [`restore`](crate::mapper::DatabaseTableGroup::restore) to reinstate the
//! captured rows. They serialize to JSON so callers can stack them on an
//! undo history or persist them across sessions.

use crate::core::error::{PersistenceError, Result};
use crate::core::value::Row;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Detached snapshot of rows, grouped per table
///
/// Tables are kept in a sorted map so serialization output is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    tables: BTreeMap<String, Vec<Row>>,
}

impl SaveData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the captured rows of one table, merging with any rows already
    /// captured for it
    pub fn add_rows(&mut self, table: impl Into<String>, rows: Vec<Row>) {
        self.tables.entry(table.into()).or_default().extend(rows);
    }

    /// Captured rows of one table; empty when the table was not captured
    pub fn rows(&self, table: &str) -> &[Row] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Captured tables with their rows, in table-name order
    pub fn tables(&self) -> impl Iterator<Item = (&str, &[Row])> {
        self.tables
            .iter()
            .map(|(table, rows)| (table.as_str(), rows.as_slice()))
    }

    /// Total number of captured rows across all tables
    pub fn row_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.values().all(Vec::is_empty)
    }

    /// Serialize the snapshot to a JSON string
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| PersistenceError::snapshot(e.to_string()))
    }

    /// Deserialize a snapshot from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| PersistenceError::snapshot(e.to_string()))
    }
}
