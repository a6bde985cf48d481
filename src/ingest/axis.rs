//! Shared row index for a batch
//!
//! Benchmark generators reuse the same tick values across entities, so raw
//! timestamps alone would alias unrelated entities onto one row. Each row is
//! therefore identified by a `(entity, tick)` key whose store-facing timestamp
//! is `tick + entity`. Two keys whose adjusted timestamps coincide share a row
//! because the store has a single time column; such merges are counted.

use std::collections::HashMap;
use tracing::debug;

use crate::error::{LoaderError, Result};
use crate::ingest::entity::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowKey {
    pub entity: EntityId,
    pub tick: i64,
}

impl RowKey {
    pub fn new(tick: i64, entity: EntityId) -> Self {
        Self { entity, tick }
    }

    /// Timestamp written to the store for this row
    pub fn adjusted(&self) -> Option<i64> {
        i64::try_from(self.entity)
            .ok()
            .and_then(|offset| self.tick.checked_add(offset))
    }
}

#[derive(Debug, Default)]
pub struct TimestampAxis {
    keys: Vec<RowKey>,
    timestamps: Vec<i64>,
    index: HashMap<i64, usize>,
    collisions: usize,
}

impl TimestampAxis {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the row for (`tick`, `entity`), appending a new row on first sight.
    pub fn register(&mut self, tick: i64, entity: EntityId) -> Result<usize> {
        let key = RowKey::new(tick, entity);
        let adjusted = key.adjusted().ok_or_else(|| {
            LoaderError::Parse(format!(
                "timestamp {} overflows when offset by entity {}",
                tick, entity
            ))
        })?;

        if let Some(&row) = self.index.get(&adjusted) {
            if self.keys[row] != key {
                self.collisions += 1;
                debug!(
                    "Row key {:?} collides with {:?} at adjusted timestamp {}",
                    key, self.keys[row], adjusted
                );
            }
            return Ok(row);
        }

        let row = self.keys.len();
        self.keys.push(key);
        self.timestamps.push(adjusted);
        self.index.insert(adjusted, row);
        Ok(row)
    }

    pub fn position(&self, tick: i64, entity: EntityId) -> Option<usize> {
        let adjusted = RowKey::new(tick, entity).adjusted()?;
        self.index.get(&adjusted).copied()
    }

    /// Key that created `row`
    pub fn key(&self, row: usize) -> Option<RowKey> {
        self.keys.get(row).copied()
    }

    /// Adjusted timestamps in row order
    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    /// Registrations that landed on a row created by a different key
    pub fn collisions(&self) -> usize {
        self.collisions
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn into_timestamps(self) -> Vec<i64> {
        self.timestamps
    }
}

#[cfg(test)]
#[path = "axis_test.rs"]
mod axis_test;
