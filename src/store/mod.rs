// Copyright 2025 Muvon Un Limited
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Column write interface of the target store and the bundled sinks

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{SinkConfig, SinkKind};
use crate::error::{LoaderError, Result};
use crate::ingest::matrix::{DataType, Value};

pub mod arrow_ipc;
pub mod jsonl;
pub mod memory;

pub use arrow_ipc::ArrowStore;
pub use jsonl::JsonLinesStore;
pub use memory::MemoryStore;

/// A finished column write for one batch
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InsertRequest {
    pub paths: Vec<String>,
    pub timestamps: Vec<i64>,
    /// `values[path][row]`
    pub values: Vec<Vec<Option<Value>>>,
    pub types: Vec<DataType>,
}

impl InsertRequest {
    /// Check that the column and row shapes agree
    pub fn validate(&self) -> Result<()> {
        if self.values.len() != self.paths.len() || self.types.len() != self.paths.len() {
            return Err(LoaderError::Shape(format!(
                "{} paths, {} columns, {} types",
                self.paths.len(),
                self.values.len(),
                self.types.len()
            )));
        }

        for (path, column) in self.paths.iter().zip(&self.values) {
            if column.len() != self.timestamps.len() {
                return Err(LoaderError::Shape(format!(
                    "column '{}' has {} cells for {} timestamps",
                    path,
                    column.len(),
                    self.timestamps.len()
                )));
            }
        }

        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn column(&self, path: &str) -> Option<&[Option<Value>]> {
        let idx = self.paths.iter().position(|p| p == path)?;
        self.values.get(idx).map(Vec::as_slice)
    }

    pub fn row_of(&self, timestamp: i64) -> Option<usize> {
        self.timestamps.iter().position(|&t| t == timestamp)
    }

    /// Value at (`path`, row whose timestamp is `timestamp`)
    pub fn cell(&self, path: &str, timestamp: i64) -> Option<&Value> {
        let row = self.row_of(timestamp)?;
        self.column(path)?.get(row)?.as_ref()
    }

    /// Number of populated cells across all columns
    pub fn populated(&self) -> usize {
        self.values
            .iter()
            .map(|c| c.iter().filter(|v| v.is_some()).count())
            .sum()
    }
}

/// Client side of the store's bulk column insert
///
/// One instance is shared by every batch worker.
pub trait ColumnStore: Send + Sync {
    /// Connect using a comma-separated endpoint list
    fn open(&self, _connection: &str) -> Result<()> {
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }

    fn insert(&self, request: &InsertRequest) -> Result<()>;
}

/// Build the sink selected in `config`
pub fn from_config(config: &SinkConfig) -> Result<Arc<dyn ColumnStore>> {
    let store: Arc<dyn ColumnStore> = match (config.kind, &config.path) {
        (SinkKind::Memory, _) => Arc::new(MemoryStore::new()),
        (SinkKind::Jsonl, Some(path)) => Arc::new(JsonLinesStore::to_file(path)),
        (SinkKind::Jsonl, None) => Arc::new(JsonLinesStore::to_stdout()),
        (SinkKind::Arrow, Some(dir)) => Arc::new(ArrowStore::new(dir)),
        (SinkKind::Arrow, None) => {
            return Err(LoaderError::Config(
                "Arrow sink requires an output directory".to_string(),
            ))
        }
    };
    Ok(store)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
