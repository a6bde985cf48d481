//! Concurrent bulk load over a stream of batches

use rayon::prelude::*;
use std::io::BufRead;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{error, info};

use crate::batch::BatchScanner;
use crate::error::{LoaderError, Result};
use crate::loader::{BatchOutcome, Loader};
use crate::session::Session;

/// Totals for a whole load
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoadSummary {
    pub batches: u64,
    pub failed_batches: u64,
    pub rows: u64,
    pub metrics: u64,
    pub parse_failures: u64,
    pub elapsed: Duration,
}

impl LoadSummary {
    fn add(&mut self, outcome: &BatchOutcome) {
        self.batches += 1;
        if outcome.failed {
            self.failed_batches += 1;
        }
        self.rows += outcome.rows;
        self.metrics += outcome.metrics;
        self.parse_failures += outcome.parse_failures;
    }

    pub fn rows_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.rows as f64 / secs
        } else {
            0.0
        }
    }

    pub fn metrics_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.metrics as f64 / secs
        } else {
            0.0
        }
    }
}

/// Process every batch from `scanner` on `workers` threads (0 = one per CPU).
///
/// A read error stops the load and is returned once in-flight batches finish.
pub fn load<R>(scanner: BatchScanner<R>, loader: &Loader, workers: usize) -> Result<LoadSummary>
where
    R: BufRead + Send,
{
    let workers = if workers == 0 {
        rayon::current_num_threads()
    } else {
        workers
    };
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("tsload-worker-{}", i))
        .build()
        .map_err(|e| LoaderError::Config(format!("Failed to build worker pool: {}", e)))?;
    info!("Loading with {} workers", workers);

    let start = Instant::now();
    let summary = Mutex::new(LoadSummary::default());
    let read_error: Mutex<Option<LoaderError>> = Mutex::new(None);

    pool.install(|| {
        scanner.par_bridge().for_each(|batch| match batch {
            Ok(batch) => {
                let outcome = loader.process_batch(batch);
                summary
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .add(&outcome);
            }
            Err(e) => {
                error!("Failed to read input: {}", e);
                read_error
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .get_or_insert(e);
            }
        });
    });

    if let Some(e) = read_error.into_inner().unwrap_or_else(|e| e.into_inner()) {
        return Err(e);
    }

    let mut summary = summary.into_inner().unwrap_or_else(|e| e.into_inner());
    summary.elapsed = start.elapsed();
    Ok(summary)
}

/// Open `session`, load every batch from `scanner`, then close the session.
///
/// The session is closed whether or not the load succeeds; a load error takes
/// precedence over a close error.
pub fn load_session<R>(
    session: &Session,
    scanner: BatchScanner<R>,
    loader: &Loader,
    workers: usize,
) -> Result<LoadSummary>
where
    R: BufRead + Send,
{
    session.open()?;
    let result = load(scanner, loader, workers);
    let closed = session.close();
    let summary = result?;
    closed?;
    Ok(summary)
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod runner_test;
