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

//! tsload - benchmark data loader for column-oriented time series stores
//!
//! Reads line-protocol metric records in batches, deduplicates entities,
//! unifies each batch onto a shared timestamp axis and submits the resulting
//! sparse column matrix to the store with bounded retry.

pub mod batch;
pub mod config;
pub mod error;
pub mod ingest;
pub mod loader;
pub mod pool;
pub mod runner;
pub mod session;
pub mod store;

pub use batch::{open_input, Batch, BatchScanner};
pub use config::Config;
pub use error::{LoaderError, Result};
pub use ingest::{transform, BatchBuilder, TransformedBatch};
pub use loader::{BatchOutcome, Loader, RetryPolicy};
pub use pool::BufferPool;
pub use runner::{load, load_session, LoadSummary};
pub use session::Session;
pub use store::{ColumnStore, InsertRequest};
