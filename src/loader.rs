//! Batch submission with bounded retry

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::batch::Batch;
use crate::config::RetryConfig;
use crate::error::{LoaderError, Result};
use crate::ingest;
use crate::store::{ColumnStore, InsertRequest};

/// How many times an insert is attempted and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::ZERO,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            delay: config.delay(),
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds or the attempts are used up.
    ///
    /// Returns the number of attempts made on success; on exhaustion the
    /// last attempt's error is carried inside `RetriesExhausted`.
    pub fn run<F>(&self, mut op: F) -> Result<u32>
    where
        F: FnMut() -> Result<()>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op() {
                Ok(()) => return Ok(attempt),
                Err(e) if attempt >= attempts => {
                    warn!("Insert attempt {}/{} failed: {}", attempt, attempts, e);
                    return Err(LoaderError::RetriesExhausted {
                        attempts,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    warn!("Insert attempt {}/{} failed: {}", attempt, attempts, e);
                    if !self.delay.is_zero() {
                        std::thread::sleep(self.delay);
                    }
                }
            }
        }
    }
}

/// Progress reported for one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub metrics: u64,
    pub rows: u64,
    pub parse_failures: u64,
    pub failed: bool,
}

impl BatchOutcome {
    /// `(metrics, rows)` as reported to the caller
    pub fn counts(&self) -> (u64, u64) {
        (self.metrics, self.rows)
    }

    fn failure(parse_failures: u64) -> Self {
        Self {
            parse_failures,
            failed: true,
            ..Self::default()
        }
    }
}

/// Turns batches into insert requests and pushes them into the store
pub struct Loader {
    store: Arc<dyn ColumnStore>,
    policy: RetryPolicy,
    do_load: bool,
}

impl Loader {
    pub fn new(store: Arc<dyn ColumnStore>, policy: RetryPolicy) -> Self {
        Self {
            store,
            policy,
            do_load: true,
        }
    }

    /// When disabled, batches are consumed without being transformed or sent
    pub fn with_do_load(mut self, do_load: bool) -> Self {
        self.do_load = do_load;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn store(&self) -> &Arc<dyn ColumnStore> {
        &self.store
    }

    /// Insert `request`, retrying per the policy. Returns the attempts used.
    pub fn submit(&self, request: &InsertRequest) -> Result<u32> {
        self.policy.run(|| self.store.insert(request))
    }

    /// Transform and submit one batch.
    ///
    /// The batch (and its pooled buffer) is released when this returns,
    /// whatever the outcome.
    pub fn process_batch(&self, batch: Batch) -> BatchOutcome {
        if !self.do_load {
            return BatchOutcome::default();
        }

        let start = Instant::now();
        let transformed = match ingest::transform(batch.lines()) {
            Ok(transformed) => transformed,
            Err(e) => {
                warn!(
                    "[write stats] Span = {}ms, Failure: {}",
                    start.elapsed().as_millis(),
                    e
                );
                return BatchOutcome::failure(0);
            }
        };
        drop(batch);

        if transformed.parse_failures > 0 {
            warn!(
                "Skipped {} malformed records in batch",
                transformed.parse_failures
            );
        }
        if transformed.collisions > 0 {
            debug!(
                "{} row keys merged on shared timestamps",
                transformed.collisions
            );
        }

        if transformed.request.is_empty() {
            return BatchOutcome {
                parse_failures: transformed.parse_failures,
                ..BatchOutcome::default()
            };
        }

        match self.submit(&transformed.request) {
            Ok(attempts) => {
                info!(
                    "[write stats] Span = {}ms, Success: {} rows, {} paths, {} attempt(s)",
                    start.elapsed().as_millis(),
                    transformed.request.timestamps.len(),
                    transformed.request.paths.len(),
                    attempts
                );
                BatchOutcome {
                    metrics: transformed.metrics,
                    rows: transformed.rows,
                    parse_failures: transformed.parse_failures,
                    failed: false,
                }
            }
            Err(e) => {
                warn!(
                    "[write stats] Span = {}ms, Failure: {}",
                    start.elapsed().as_millis(),
                    e
                );
                BatchOutcome::failure(transformed.parse_failures)
            }
        }
    }
}

#[cfg(test)]
#[path = "loader_test.rs"]
mod loader_test;
