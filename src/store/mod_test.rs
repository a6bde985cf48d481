use super::*;

fn request() -> InsertRequest {
    InsertRequest {
        paths: vec!["readings.fuel".to_string(), "tags.fleet".to_string()],
        timestamps: vec![1000, 2000],
        values: vec![
            vec![Some(Value::Double(0.5)), Some(Value::Double(0.4))],
            vec![Some(Value::Binary("A".into())), None],
        ],
        types: vec![DataType::Double, DataType::Binary],
    }
}

#[test]
fn test_validate_consistent_request() {
    assert!(request().validate().is_ok());
    assert!(InsertRequest::default().validate().is_ok());
}

#[test]
fn test_validate_column_count_mismatch() {
    let mut req = request();
    req.types.pop();
    assert!(matches!(req.validate(), Err(LoaderError::Shape(_))));

    let mut req = request();
    req.values.pop();
    assert!(req.validate().is_err());
}

#[test]
fn test_validate_row_count_mismatch() {
    let mut req = request();
    req.values[1].push(None);
    assert!(matches!(req.validate(), Err(LoaderError::Shape(_))));
}

#[test]
fn test_cell_lookup() {
    let req = request();
    assert_eq!(req.cell("readings.fuel", 2000), Some(&Value::Double(0.4)));
    assert_eq!(req.cell("tags.fleet", 2000), None);
    assert_eq!(req.cell("tags.fleet", 3000), None);
    assert_eq!(req.cell("readings.missing", 1000), None);
    assert_eq!(req.populated(), 3);
    assert!(!req.is_empty());
}

#[test]
fn test_serializes_type_tags_and_cells() {
    let json = serde_json::to_value(request()).unwrap();
    assert_eq!(json["types"], serde_json::json!(["DOUBLE", "BINARY"]));
    assert_eq!(json["values"][1], serde_json::json!(["A", null]));
    assert_eq!(json["timestamps"], serde_json::json!([1000, 2000]));
}

#[test]
fn test_from_config() {
    let config = SinkConfig::default();
    assert!(from_config(&config).is_ok());

    let config = SinkConfig {
        kind: SinkKind::Arrow,
        path: None,
    };
    assert!(matches!(from_config(&config), Err(LoaderError::Config(_))));
}
