use arrow::array::{Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::DataType as ArrowType;
use arrow::ipc::reader::FileReader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use tempfile::TempDir;

use tsload::config::{SinkConfig, SinkKind};
use tsload::ingest::matrix::Value;
use tsload::store::arrow_ipc::{to_record_batch, TIME_COLUMN};
use tsload::store::{self, ArrowStore, ColumnStore, InsertRequest, JsonLinesStore};
use tsload::transform;

fn request() -> InsertRequest {
    transform([
        "readings,name=truck_1,fleet=East velocity=30,heading=90i 1000",
        "readings,name=truck_2,fleet=West velocity=45.5 1000",
        "readings,name=truck_1,fleet=East velocity=31 2000",
    ])
    .unwrap()
    .request
}

#[test]
fn test_jsonl_sink_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out").join("requests.jsonl");
    let sink = JsonLinesStore::to_file(&path);

    sink.open("127.0.0.1:6888").unwrap();
    sink.insert(&request()).unwrap();
    sink.insert(&request()).unwrap();
    sink.close().unwrap();

    let lines: Vec<String> = BufReader::new(File::open(&path).unwrap())
        .lines()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(lines.len(), 2);

    let decoded: InsertRequest = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(decoded, request());
    assert_eq!(decoded.cell("readings.velocity", 1001), Some(&Value::Double(45.5)));
}

#[test]
fn test_jsonl_sink_requires_open() {
    let dir = TempDir::new().unwrap();
    let sink = JsonLinesStore::to_file(&dir.path().join("never.jsonl"));
    assert!(sink.insert(&request()).is_err());
}

#[test]
fn test_arrow_sink_writes_one_file_per_request() {
    let dir = TempDir::new().unwrap();
    let sink = ArrowStore::new(&dir.path().join("batches"));

    sink.open("127.0.0.1:6888").unwrap();
    sink.insert(&request()).unwrap();
    sink.insert(&request()).unwrap();
    assert_eq!(sink.files_written(), 2);

    let files: Vec<_> = std::fs::read_dir(sink.dir())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(files.len(), 2);

    let reader = FileReader::try_new(File::open(&files[0]).unwrap(), None).unwrap();
    let batches: Vec<_> = reader.collect::<Result<_, _>>().unwrap();
    assert_eq!(batches.len(), 1);

    let batch = &batches[0];
    let expected = request();
    assert_eq!(batch.num_rows(), expected.timestamps.len());
    assert_eq!(batch.num_columns(), expected.paths.len() + 1);

    let schema = batch.schema();
    assert_eq!(schema.field(0).name(), TIME_COLUMN);
    assert!(!schema.field(0).is_nullable());

    let time = batch
        .column(0)
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(time.values().to_vec(), vec![1000, 1001, 2000]);
}

#[test]
fn test_record_batch_columns() {
    let request = request();
    let batch = to_record_batch(&request).unwrap();
    let schema = batch.schema();

    let velocity_idx = schema.index_of("readings.velocity").unwrap();
    assert_eq!(schema.field(velocity_idx).data_type(), &ArrowType::Float64);
    let velocity = batch
        .column(velocity_idx)
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    assert_eq!(velocity.value(0), 30.0);
    assert_eq!(velocity.value(1), 45.5);
    assert_eq!(velocity.value(2), 31.0);

    let fleet_idx = schema.index_of("tags.fleet").unwrap();
    let fleet = batch
        .column(fleet_idx)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(fleet.value(0), "East");
    assert_eq!(fleet.value(1), "West");
    assert!(fleet.is_null(2));

    // Template columns nobody wrote stay all-null
    let model_idx = schema.index_of("tags.model").unwrap();
    assert_eq!(batch.column(model_idx).null_count(), 3);
}

#[test]
fn test_sink_from_config() {
    let dir = TempDir::new().unwrap();
    let config = SinkConfig {
        kind: SinkKind::Arrow,
        path: Some(dir.path().to_path_buf()),
    };
    let sink = store::from_config(&config).unwrap();
    sink.open("127.0.0.1:6888").unwrap();
    sink.insert(&request()).unwrap();
    sink.close().unwrap();

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_sinks_reject_misshapen_requests() {
    let dir = TempDir::new().unwrap();
    let mut bad = request();
    bad.values[0].pop();

    let arrow = ArrowStore::new(dir.path());
    arrow.open("127.0.0.1:6888").unwrap();
    assert!(arrow.insert(&bad).is_err());
    assert_eq!(arrow.files_written(), 0);

    let jsonl = JsonLinesStore::to_file(&dir.path().join("bad.jsonl"));
    jsonl.open("127.0.0.1:6888").unwrap();
    assert!(jsonl.insert(&bad).is_err());
}
