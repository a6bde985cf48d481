//! Line batches backed by pooled buffers

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::pool::{BufferPool, PooledBuffer};

/// A bounded group of record lines submitted together
#[derive(Debug)]
pub struct Batch {
    buf: PooledBuffer,
    len: usize,
}

impl Batch {
    pub fn new(buf: PooledBuffer) -> Self {
        Self { buf, len: 0 }
    }

    /// Append one record line
    pub fn append(&mut self, line: &str) {
        self.buf.push_str(line.trim_end_matches(['\n', '\r']));
        self.buf.push('\n');
        self.len += 1;
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.buf.lines()
    }

    /// Number of lines held
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Open `path` for reading, or stdin when no path is given
pub fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead + Send>> {
    match path {
        Some(path) => {
            let file = File::open(path)?;
            info!("Reading records from {}", path.display());
            Ok(Box::new(BufReader::new(file)))
        }
        None => {
            info!("Reading records from stdin");
            Ok(Box::new(BufReader::new(std::io::stdin())))
        }
    }
}

/// Splits a line stream into batches of at most `batch_size` records
pub struct BatchScanner<R> {
    reader: R,
    pool: Arc<BufferPool>,
    batch_size: usize,
    line: String,
    done: bool,
}

impl<R: BufRead> BatchScanner<R> {
    pub fn new(reader: R, pool: Arc<BufferPool>, batch_size: usize) -> Self {
        Self {
            reader,
            pool,
            batch_size: batch_size.max(1),
            line: String::new(),
            done: false,
        }
    }

    fn fill(&mut self) -> Result<Option<Batch>> {
        let mut batch = Batch::new(self.pool.acquire());
        while batch.len() < self.batch_size {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                self.done = true;
                break;
            }
            if self.line.trim().is_empty() {
                continue;
            }
            batch.append(&self.line);
        }
        Ok((!batch.is_empty()).then_some(batch))
    }
}

impl<R: BufRead> Iterator for BatchScanner<R> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.fill() {
            Ok(batch) => batch.map(Ok),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
#[path = "batch_test.rs"]
mod batch_test;
