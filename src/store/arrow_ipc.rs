//! Arrow IPC sink
//!
//! Each insert request becomes one Arrow file: a non-null `time` column
//! followed by one nullable column per path, in request order.

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType as ArrowType, Field, Schema};
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::Result;
use crate::ingest::matrix::{DataType, Value};
use crate::store::{ColumnStore, InsertRequest};

pub const TIME_COLUMN: &str = "time";

#[derive(Debug)]
pub struct ArrowStore {
    dir: PathBuf,
    files: AtomicU64,
}

impl ArrowStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            files: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files written since this store was created
    pub fn files_written(&self) -> u64 {
        self.files.load(Ordering::Relaxed)
    }
}

pub fn to_record_batch(request: &InsertRequest) -> Result<RecordBatch> {
    request.validate()?;

    let mut fields = Vec::with_capacity(request.paths.len() + 1);
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(request.paths.len() + 1);

    fields.push(Field::new(TIME_COLUMN, ArrowType::Int64, false));
    columns.push(Arc::new(Int64Array::from(request.timestamps.clone())));

    for ((path, data_type), cells) in request
        .paths
        .iter()
        .zip(&request.types)
        .zip(&request.values)
    {
        let (arrow_type, array): (ArrowType, ArrayRef) = match data_type {
            DataType::Long => (
                ArrowType::Int64,
                Arc::new(Int64Array::from(
                    cells
                        .iter()
                        .map(|c| c.as_ref().and_then(Value::as_i64))
                        .collect::<Vec<_>>(),
                )),
            ),
            DataType::Double => (
                ArrowType::Float64,
                Arc::new(Float64Array::from(
                    cells
                        .iter()
                        .map(|c| c.as_ref().and_then(Value::as_f64))
                        .collect::<Vec<_>>(),
                )),
            ),
            DataType::Binary => (
                ArrowType::Utf8,
                Arc::new(StringArray::from(
                    cells
                        .iter()
                        .map(|c| c.as_ref().and_then(Value::as_str))
                        .collect::<Vec<_>>(),
                )),
            ),
        };
        fields.push(Field::new(path.as_str(), arrow_type, true));
        columns.push(array);
    }

    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
    Ok(batch)
}

impl ColumnStore for ArrowStore {
    fn open(&self, connection: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        info!(
            "Arrow sink writing to {} in place of {}",
            self.dir.display(),
            connection
        );
        Ok(())
    }

    fn insert(&self, request: &InsertRequest) -> Result<()> {
        let batch = to_record_batch(request)?;

        let path = self
            .dir
            .join(format!("batch_{}.arrow", uuid::Uuid::new_v4()));
        let file = File::create(&path)?;
        let mut writer = FileWriter::try_new(file, &batch.schema())?;
        writer.write(&batch)?;
        writer.finish()?;

        self.files.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Wrote {} rows x {} paths to {}",
            batch.num_rows(),
            request.paths.len(),
            path.display()
        );
        Ok(())
    }
}
