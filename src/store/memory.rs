use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::debug;

use crate::error::{LoaderError, Result};
use crate::store::{ColumnStore, InsertRequest};

/// Store that keeps every accepted request in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    requests: Mutex<Vec<InsertRequest>>,
    open: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the accepted requests in arrival order
    pub fn requests(&self) -> Vec<InsertRequest> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Total rows across all accepted requests
    pub fn total_rows(&self) -> usize {
        self.lock().iter().map(|r| r.timestamps.len()).sum()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<InsertRequest>> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ColumnStore for MemoryStore {
    fn open(&self, connection: &str) -> Result<()> {
        debug!("Memory store opened for {}", connection);
        self.open.store(true, Ordering::Release);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.open.store(false, Ordering::Release);
        Ok(())
    }

    fn insert(&self, request: &InsertRequest) -> Result<()> {
        request.validate()?;
        if request.is_empty() {
            return Err(LoaderError::Insert("empty insert request".to_string()));
        }
        self.lock().push(request.clone());
        Ok(())
    }
}
