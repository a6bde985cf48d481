//! Measurement families and their output path templates
//!
//! A batch is shaped by exactly one family, detected from its first record:
//!
//! - `Telemetry`: multi-entity fleet data (`readings`, `diagnostics`). Entity
//!   attributes land in `tags.*` columns once per entity, readings land in
//!   `<measurement>.<field>` columns on every observed row.
//! - `Host`: per-host system metrics (`cpu`). A flat table where each row also
//!   carries its hostname.

use tracing::trace;

use crate::error::{LoaderError, Result};
use crate::ingest::entity::Entity;
use crate::ingest::matrix::{ColumnMatrix, DataType, Value};
use crate::ingest::parser::{canonicalize, normalize_entity_name, parse_number, RawRecord};

/// Entity key used for telemetry records that carry no name
pub const UNNAMED_ENTITY: &str = "unnamed";

const TELEMETRY_MEASUREMENTS: &[&str] = &["readings", "diagnostics"];
const DEFAULT_MEASUREMENT: &str = "readings";

const DESCRIPTIVE_TAGS: &[&str] = &["fleet", "driver", "model", "device_version"];

pub const TELEMETRY_PERFORMANCE: &[&str] =
    &["fuel_capacity", "load_capacity", "nominal_fuel_consumption"];

const TELEMETRY_TEMPLATE: &[(&str, DataType)] = &[
    ("tags.name", DataType::Binary),
    ("tags.fleet", DataType::Binary),
    ("tags.driver", DataType::Binary),
    ("tags.model", DataType::Binary),
    ("tags.device_version", DataType::Binary),
    ("tags.fuel_capacity", DataType::Double),
    ("tags.load_capacity", DataType::Double),
    ("tags.nominal_fuel_consumption", DataType::Double),
    ("tags.tagid", DataType::Long),
    ("readings.tagid", DataType::Long),
    ("diagnostics.tagid", DataType::Long),
    ("readings.timestamp", DataType::Long),
    ("diagnostics.timestamp", DataType::Long),
];

const HOST_TEMPLATE: &[(&str, DataType)] = &[
    ("cpu.hostname", DataType::Binary),
    ("cpu.usage_user", DataType::Long),
    ("cpu.usage_system", DataType::Long),
    ("cpu.usage_idle", DataType::Long),
    ("cpu.usage_nice", DataType::Long),
    ("cpu.usage_iowait", DataType::Long),
    ("cpu.usage_irq", DataType::Long),
    ("cpu.usage_softirq", DataType::Long),
    ("cpu.usage_steal", DataType::Long),
    ("cpu.usage_guest", DataType::Long),
    ("cpu.usage_guest_nice", DataType::Long),
    ("cpu.timestamp", DataType::Long),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Telemetry,
    Host,
}

/// A record reshaped by its family, ready for registration
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub entity_key: String,
    pub attributes: Vec<(String, Value)>,
    pub measurement: String,
    /// `(path, value)` pairs already coerced to their column type
    pub readings: Vec<(String, Value)>,
    pub tick: i64,
}

impl Family {
    pub fn detect(record: &RawRecord) -> Self {
        if record.measurement == "cpu" || record.tag("hostname").is_some() {
            Family::Host
        } else {
            Family::Telemetry
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Family::Telemetry => "telemetry",
            Family::Host => "host",
        }
    }

    /// Paths registered, in order, before any record is written
    pub fn template(&self) -> &'static [(&'static str, DataType)] {
        match self {
            Family::Telemetry => TELEMETRY_TEMPLATE,
            Family::Host => HOST_TEMPLATE,
        }
    }

    pub fn performance_attributes(&self) -> &'static [&'static str] {
        match self {
            Family::Telemetry => TELEMETRY_PERFORMANCE,
            Family::Host => &[],
        }
    }

    /// Type of `path` in this family; paths outside the template hold doubles
    pub fn column_type(&self, path: &str) -> DataType {
        self.template()
            .iter()
            .find(|(p, _)| *p == path)
            .map(|(_, t)| *t)
            .unwrap_or(DataType::Double)
    }

    fn context_fields(&self) -> &'static [&'static str] {
        match self {
            Family::Telemetry => &["tagid", "timestamp"],
            Family::Host => &["hostname", "timestamp"],
        }
    }

    pub fn shape(&self, record: RawRecord) -> Result<Observation> {
        match self {
            Family::Telemetry => self.shape_telemetry(record),
            Family::Host => self.shape_host(record),
        }
    }

    fn shape_telemetry(&self, record: RawRecord) -> Result<Observation> {
        if Family::detect(&record) == Family::Host {
            return Err(LoaderError::Parse(format!(
                "host record '{}' in a telemetry batch",
                record.measurement
            )));
        }

        let name = record.tag("name").map(str::to_string);
        let known = TELEMETRY_MEASUREMENTS.contains(&record.measurement.as_str());

        // A bare head that is neither a known measurement nor accompanied by a
        // name tag is the entity itself
        let (measurement, name) = if known || name.is_some() {
            (canonicalize(&record.measurement), name)
        } else {
            (
                DEFAULT_MEASUREMENT.to_string(),
                Some(record.measurement.clone()),
            )
        };

        let entity_key = name
            .map(|n| normalize_entity_name(&canonicalize(&n)))
            .unwrap_or_else(|| UNNAMED_ENTITY.to_string());

        let mut attributes = Vec::new();
        for (key, value) in &record.tags {
            if DESCRIPTIVE_TAGS.contains(&key.as_str()) {
                attributes.push((key.clone(), Value::Binary(value.clone())));
            } else if TELEMETRY_PERFORMANCE.contains(&key.as_str()) {
                let value = parse_number(value)?.coerce(DataType::Double)?;
                attributes.push((key.clone(), value));
            } else if key != "name" {
                trace!("Ignoring tag '{}' on entity '{}'", key, entity_key);
            }
        }

        let mut readings = Vec::with_capacity(record.fields.len());
        for (key, value) in record.fields {
            if TELEMETRY_PERFORMANCE.contains(&key.as_str()) {
                attributes.push((key, value.coerce(DataType::Double)?));
                continue;
            }
            readings.push(self.reading(&measurement, &key, value)?);
        }

        Ok(Observation {
            entity_key,
            attributes,
            measurement,
            readings,
            tick: record.timestamp,
        })
    }

    fn shape_host(&self, record: RawRecord) -> Result<Observation> {
        let hostname = record
            .tag("hostname")
            .ok_or_else(|| {
                LoaderError::Parse(format!(
                    "host record for '{}' has no hostname tag",
                    record.measurement
                ))
            })?
            .to_string();
        let measurement = canonicalize(&record.measurement);

        let mut readings = Vec::with_capacity(record.fields.len());
        for (key, value) in record.fields {
            readings.push(self.reading(&measurement, &key, value)?);
        }

        Ok(Observation {
            entity_key: canonicalize(&hostname),
            attributes: vec![("hostname".to_string(), Value::Binary(hostname))],
            measurement,
            readings,
            tick: record.timestamp,
        })
    }

    fn reading(&self, measurement: &str, field: &str, value: Value) -> Result<(String, Value)> {
        let field = canonicalize(field);
        if self.context_fields().contains(&field.as_str()) {
            return Err(LoaderError::Parse(format!(
                "field '{}' is reserved in {} records",
                field,
                self.name()
            )));
        }
        let path = format!("{}.{}", measurement, field);
        let value = value
            .coerce(self.column_type(&path))
            .map_err(|e| LoaderError::Parse(format!("{}: {}", path, e)))?;
        Ok((path, value))
    }

    /// Write one observation's per-row cells
    pub fn write_row(
        &self,
        matrix: &mut ColumnMatrix,
        observation: &Observation,
        entity: &Entity,
        row: usize,
    ) -> Result<()> {
        for (path, value) in &observation.readings {
            matrix.set_cell(path, row, value.clone())?;
        }

        let m = &observation.measurement;
        match self {
            Family::Telemetry => {
                matrix.set_cell(&format!("{}.tagid", m), row, Value::Long(entity.id as i64))?;
            }
            Family::Host => {
                let hostname = entity
                    .attribute("hostname")
                    .cloned()
                    .unwrap_or_else(|| Value::Binary(entity.key.clone()));
                matrix.set_cell(&format!("{}.hostname", m), row, hostname)?;
            }
        }
        matrix.set_cell(&format!("{}.timestamp", m), row, Value::Long(observation.tick))
    }

    /// Write an entity's attribute cells at its first row
    pub fn write_attributes(&self, matrix: &mut ColumnMatrix, entity: &Entity) -> Result<()> {
        let row = match (self, entity.first_row) {
            (Family::Telemetry, Some(row)) => row,
            _ => return Ok(()),
        };

        matrix.set_cell("tags.name", row, Value::Binary(entity.key.clone()))?;
        matrix.set_cell("tags.tagid", row, Value::Long(entity.id as i64))?;
        for (name, value) in &entity.attributes {
            matrix.set_cell(&format!("tags.{}", name), row, value.clone())?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "family_test.rs"]
mod family_test;
