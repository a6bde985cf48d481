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

//! Sparse column matrix for a single batch
//!
//! One array per output path, each exactly as long as the batch's timestamp
//! axis. Cells are only populated where a value was observed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{LoaderError, Result};

/// Type tag attached to every output path
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    /// 64-bit signed integer
    Long,
    /// 64-bit floating point number
    Double,
    /// UTF-8 string
    Binary,
}

/// A single typed cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Long(i64),
    Double(f64),
    Binary(String),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Long(_) => DataType::Long,
            Value::Double(_) => DataType::Double,
            Value::Binary(_) => DataType::Binary,
        }
    }

    /// Convert into `target`, widening integers into doubles.
    ///
    /// Narrowing a double into a long is rejected rather than truncated.
    pub fn coerce(self, target: DataType) -> Result<Value> {
        match (self, target) {
            (Value::Long(v), DataType::Long) => Ok(Value::Long(v)),
            (Value::Long(v), DataType::Double) => Ok(Value::Double(v as f64)),
            (Value::Double(v), DataType::Double) => Ok(Value::Double(v)),
            (Value::Binary(v), DataType::Binary) => Ok(Value::Binary(v)),
            (value, target) => Err(LoaderError::Parse(format!(
                "cannot store {:?} in a {:?} column",
                value, target
            ))),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Long(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            Value::Binary(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Binary(v) => Some(v),
            _ => None,
        }
    }
}

/// Column-oriented write buffer
///
/// Paths are append-only: the first registration of a path fixes its column
/// index and type for the lifetime of the matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMatrix {
    rows: usize,
    paths: Vec<String>,
    types: Vec<DataType>,
    columns: Vec<Vec<Option<Value>>>,
    index: HashMap<String, usize>,
}

impl ColumnMatrix {
    /// Create an empty matrix whose columns will hold `rows` cells each
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            paths: Vec::new(),
            types: Vec::new(),
            columns: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Ensure `path` has a column, returning its index.
    ///
    /// Re-registering an existing path with a different type is an error.
    pub fn register(&mut self, path: &str, data_type: DataType) -> Result<usize> {
        if let Some(&idx) = self.index.get(path) {
            if self.types[idx] != data_type {
                return Err(LoaderError::Shape(format!(
                    "path '{}' already registered as {:?}, not {:?}",
                    path, self.types[idx], data_type
                )));
            }
            return Ok(idx);
        }

        let idx = self.paths.len();
        self.paths.push(path.to_string());
        self.types.push(data_type);
        self.columns.push(vec![None; self.rows]);
        self.index.insert(path.to_string(), idx);
        Ok(idx)
    }

    /// Write `value` at (`path`, `row`).
    ///
    /// An unknown path is registered with the value's own type; a known path
    /// coerces the value into the column type.
    pub fn set_cell(&mut self, path: &str, row: usize, value: Value) -> Result<()> {
        if row >= self.rows {
            return Err(LoaderError::Shape(format!(
                "row {} out of bounds for axis of length {}",
                row, self.rows
            )));
        }

        let idx = match self.index.get(path) {
            Some(&idx) => idx,
            None => self.register(path, value.data_type())?,
        };
        let value = value.coerce(self.types[idx]).map_err(|e| {
            LoaderError::Shape(format!("path '{}': {}", path, e))
        })?;
        self.columns[idx][row] = Some(value);
        Ok(())
    }

    pub fn column_index(&self, path: &str) -> Option<usize> {
        self.index.get(path).copied()
    }

    pub fn get(&self, path: &str, row: usize) -> Option<&Value> {
        let idx = self.column_index(path)?;
        self.columns[idx].get(row)?.as_ref()
    }

    /// Number of populated cells in `path`'s column
    pub fn populated(&self, path: &str) -> usize {
        self.column_index(path)
            .map(|idx| self.columns[idx].iter().filter(|c| c.is_some()).count())
            .unwrap_or(0)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn types(&self) -> &[DataType] {
        &self.types
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<DataType>, Vec<Vec<Option<Value>>>) {
        (self.paths, self.types, self.columns)
    }
}

#[cfg(test)]
#[path = "matrix_test.rs"]
mod matrix_test;
