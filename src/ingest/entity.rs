//! Per-batch entity deduplication
//!
//! Every distinct entity key seen in a batch gets a sequential synthetic id,
//! starting at zero in order of first appearance. Descriptive attributes are
//! captured from the first record; only allow-listed "performance" attributes
//! are updated by later records.

use std::collections::HashMap;
use tracing::trace;

use crate::ingest::matrix::Value;

pub type EntityId = u64;

/// A deduplicated device or host within one batch
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub key: String,
    /// Attribute values in first-seen order
    pub attributes: Vec<(String, Value)>,
    /// Axis row of the entity's first observation
    pub first_row: Option<usize>,
}

impl Entity {
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    fn upsert(&mut self, name: String, value: Value) {
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => *slot = value,
            None => self.attributes.push((name, value)),
        }
    }
}

#[derive(Debug)]
pub struct EntityRegistry {
    entities: Vec<Entity>,
    index: HashMap<String, EntityId>,
    /// Attributes that later records may overwrite
    performance: &'static [&'static str],
}

impl EntityRegistry {
    pub fn new(performance: &'static [&'static str]) -> Self {
        Self {
            entities: Vec::new(),
            index: HashMap::new(),
            performance,
        }
    }

    /// Return the id for `key`, registering it on first sight.
    pub fn resolve(&mut self, key: &str, attributes: Vec<(String, Value)>) -> EntityId {
        if let Some(&id) = self.index.get(key) {
            let performance = self.performance;
            let entity = &mut self.entities[id as usize];
            for (name, value) in attributes {
                if performance.contains(&name.as_str()) {
                    trace!("Updating {} of entity '{}'", name, key);
                    entity.upsert(name, value);
                }
            }
            return id;
        }

        let id = self.entities.len() as EntityId;
        let mut entity = Entity {
            id,
            key: key.to_string(),
            attributes: Vec::with_capacity(attributes.len()),
            first_row: None,
        };
        for (name, value) in attributes {
            entity.upsert(name, value);
        }
        self.entities.push(entity);
        self.index.insert(key.to_string(), id);
        id
    }

    /// Record `row` as the entity's first row unless one is already known
    pub fn anchor(&mut self, id: EntityId, row: usize) {
        if let Some(entity) = self.entities.get_mut(id as usize) {
            entity.first_row.get_or_insert(row);
        }
    }

    pub fn lookup(&self, key: &str) -> Option<EntityId> {
        self.index.get(key).copied()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id as usize)
    }

    /// Entities in id order
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
#[path = "entity_test.rs"]
mod entity_test;
