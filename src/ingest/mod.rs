//! Batch transformation: text lines to a column insert request
//!
//! Lines are parsed and shaped one at a time while the entity registry and
//! the timestamp axis grow. Once the axis is complete the matrix is allocated
//! at its final length and every pending observation is written into it.

use tracing::debug;

use crate::error::{LoaderError, Result};
use crate::store::InsertRequest;

pub mod axis;
pub mod entity;
pub mod family;
pub mod matrix;
pub mod parser;

use axis::TimestampAxis;
use entity::{EntityId, EntityRegistry};
use family::{Family, Observation};
use matrix::ColumnMatrix;

/// Outcome of transforming one batch
#[derive(Debug, Clone, Default)]
pub struct TransformedBatch {
    pub request: InsertRequest,
    /// Lines accepted into the request
    pub rows: u64,
    /// Field values carried by the accepted lines
    pub metrics: u64,
    pub parse_failures: u64,
    pub family: Option<Family>,
    pub entities: usize,
    /// Registrations merged into a row created by another entity
    pub collisions: usize,
}

#[derive(Debug)]
pub struct BatchBuilder {
    family: Option<Family>,
    registry: EntityRegistry,
    axis: TimestampAxis,
    pending: Vec<(usize, EntityId, Observation)>,
    rows: u64,
    metrics: u64,
    parse_failures: u64,
}

impl Default for BatchBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchBuilder {
    pub fn new() -> Self {
        Self {
            family: None,
            registry: EntityRegistry::new(&[]),
            axis: TimestampAxis::new(),
            pending: Vec::new(),
            rows: 0,
            metrics: 0,
            parse_failures: 0,
        }
    }

    /// Family detected from the first parsed line, if any
    pub fn family(&self) -> Option<Family> {
        self.family
    }

    pub fn parse_failures(&self) -> u64 {
        self.parse_failures
    }

    /// Feed one line. Malformed records are counted and skipped.
    pub fn push_line(&mut self, line: &str) -> Result<()> {
        match self.accept(line) {
            Ok(()) => Ok(()),
            Err(e) if e.is_record_local() => {
                self.parse_failures += 1;
                debug!("Skipping record '{}': {}", line.trim(), e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn accept(&mut self, line: &str) -> Result<()> {
        let record = parser::parse_line(line)?;
        let family = match self.family {
            Some(family) => family,
            None => {
                let family = Family::detect(&record);
                debug!("Detected {} batch from '{}'", family.name(), record.measurement);
                self.registry = EntityRegistry::new(family.performance_attributes());
                self.family = Some(family);
                family
            }
        };

        let fields = record.fields.len() as u64;
        let mut observation = family.shape(record)?;

        // Check the row key before the entity is registered so a rejected
        // record leaves no trace in the registry
        let next_id = self
            .registry
            .lookup(&observation.entity_key)
            .unwrap_or(self.registry.len() as EntityId);
        if axis::RowKey::new(observation.tick, next_id).adjusted().is_none() {
            return Err(LoaderError::Parse(format!(
                "timestamp {} overflows when offset by entity {}",
                observation.tick, next_id
            )));
        }

        let attributes = std::mem::take(&mut observation.attributes);
        let id = self.registry.resolve(&observation.entity_key, attributes);
        let row = self.axis.register(observation.tick, id)?;
        // Attributes only go on a row the entity created itself; a merged row
        // already carries its creator's attributes
        if self.axis.key(row).map(|key| key.entity) == Some(id) {
            self.registry.anchor(id, row);
        }

        self.pending.push((row, id, observation));
        self.rows += 1;
        self.metrics += fields;
        Ok(())
    }

    /// Allocate the matrix at the final axis length and fill it
    pub fn finish(self) -> Result<TransformedBatch> {
        let family = match self.family {
            Some(family) => family,
            None => {
                return Ok(TransformedBatch {
                    parse_failures: self.parse_failures,
                    ..TransformedBatch::default()
                })
            }
        };

        let mut matrix = ColumnMatrix::new(self.axis.len());
        for (path, data_type) in family.template() {
            matrix.register(path, *data_type)?;
        }

        for (row, id, observation) in &self.pending {
            let entity = self.registry.get(*id).ok_or_else(|| {
                LoaderError::Shape(format!("row {} refers to unknown entity {}", row, id))
            })?;
            family.write_row(&mut matrix, observation, entity, *row)?;
        }

        for entity in self.registry.iter() {
            family.write_attributes(&mut matrix, entity)?;
        }

        let collisions = self.axis.collisions();
        let (paths, types, values) = matrix.into_parts();
        let request = InsertRequest {
            paths,
            timestamps: self.axis.into_timestamps(),
            values,
            types,
        };

        Ok(TransformedBatch {
            request,
            rows: self.rows,
            metrics: self.metrics,
            parse_failures: self.parse_failures,
            family: Some(family),
            entities: self.registry.len(),
            collisions,
        })
    }
}

/// Transform a whole batch of lines
pub fn transform<'a, I>(lines: I) -> Result<TransformedBatch>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut builder = BatchBuilder::new();
    for line in lines {
        builder.push_line(line)?;
    }
    builder.finish()
}
