//! Store session lifecycle

use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use tracing::info;

use crate::error::{LoaderError, Result};
use crate::store::ColumnStore;

/// Connection to the target store, shared by every batch worker
pub struct Session {
    store: Arc<dyn ColumnStore>,
    endpoints: Vec<String>,
}

impl Session {
    /// Build a session over `endpoints` in randomized order
    pub fn new(store: Arc<dyn ColumnStore>, endpoints: &[String]) -> Self {
        let mut endpoints = endpoints.to_vec();
        shuffle_endpoints(&mut endpoints, &mut rand::thread_rng());
        Self { store, endpoints }
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Comma-separated endpoint list handed to the store client
    pub fn connection_string(&self) -> String {
        self.endpoints.join(",")
    }

    pub fn store(&self) -> Arc<dyn ColumnStore> {
        Arc::clone(&self.store)
    }

    pub fn open(&self) -> Result<()> {
        let connection = self.connection_string();
        self.store.open(&connection).map_err(|e| {
            LoaderError::Connection(format!("failed to open session on {}: {}", connection, e))
        })?;
        info!("Session opened on {}", connection);
        Ok(())
    }

    pub fn close(&self) -> Result<()> {
        self.store
            .close()
            .map_err(|e| LoaderError::Connection(format!("failed to close session: {}", e)))?;
        info!("Session closed");
        Ok(())
    }
}

pub fn shuffle_endpoints<R: Rng + ?Sized>(endpoints: &mut [String], rng: &mut R) {
    endpoints.shuffle(rng);
}
