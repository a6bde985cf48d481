//! JSON lines sink: one serialized insert request per line

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

use crate::error::{LoaderError, Result};
use crate::store::{ColumnStore, InsertRequest};

enum Target {
    Stdout,
    File(PathBuf),
}

pub struct JsonLinesStore {
    target: Target,
    writer: Mutex<Option<Box<dyn Write + Send>>>,
}

impl JsonLinesStore {
    pub fn to_file(path: &Path) -> Self {
        Self {
            target: Target::File(path.to_path_buf()),
            writer: Mutex::new(None),
        }
    }

    pub fn to_stdout() -> Self {
        Self {
            target: Target::Stdout,
            writer: Mutex::new(None),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Box<dyn Write + Send>>> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ColumnStore for JsonLinesStore {
    fn open(&self, connection: &str) -> Result<()> {
        let writer: Box<dyn Write + Send> = match &self.target {
            Target::Stdout => Box::new(std::io::stdout()),
            Target::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                info!("Writing insert requests to {}", path.display());
                Box::new(BufWriter::new(file))
            }
        };
        info!("JSON lines sink standing in for {}", connection);
        *self.lock() = Some(writer);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        if let Some(mut writer) = self.lock().take() {
            writer.flush()?;
        }
        Ok(())
    }

    fn insert(&self, request: &InsertRequest) -> Result<()> {
        request.validate()?;
        let mut line = serde_json::to_vec(request)?;
        line.push(b'\n');

        let mut guard = self.lock();
        let writer = guard
            .as_mut()
            .ok_or_else(|| LoaderError::Insert("JSON lines sink is not open".to_string()))?;
        writer.write_all(&line)?;
        Ok(())
    }
}
