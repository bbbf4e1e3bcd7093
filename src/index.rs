//! In-memory identity index: normalized names and synonyms to entity ids
//!
//! Read-heavy and shared across all requests; the only writer is entity
//! creation. Rebuilt from the entity store at startup so cache and store
//! cannot diverge across restarts.

use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::exercise::ExerciseEntity;
use crate::synonyms::expand;

pub struct IdentityIndex {
    entries: RwLock<HashMap<String, Uuid>>,
}

impl Default for IdentityIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityIndex {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Rebuild from a store snapshot
    ///
    /// Two passes keep conflicts deterministic: every entity's own
    /// normalized name is indexed first and can never be shadowed by
    /// another entity's synonym. Synonym collisions resolve to the entity
    /// earliest in normalized-name order (the snapshot is pre-sorted).
    pub fn rebuild(&self, entities: &[ExerciseEntity]) {
        let mut map = HashMap::new();

        for entity in entities {
            map.insert(entity.normalized_name.clone(), entity.id);
        }

        for entity in entities {
            for synonym in Self::synonym_keys(entity) {
                map.entry(synonym).or_insert(entity.id);
            }
        }

        *self.entries.write() = map;
    }

    /// Index a newly created entity
    pub fn insert_entity(&self, entity: &ExerciseEntity) {
        let mut map = self.entries.write();
        map.insert(entity.normalized_name.clone(), entity.id);
        for synonym in Self::synonym_keys(entity) {
            map.entry(synonym).or_insert(entity.id);
        }
    }

    fn synonym_keys(entity: &ExerciseEntity) -> Vec<String> {
        let mut keys: Vec<String> = entity.synonyms.iter().cloned().collect();
        for variant in expand(&entity.normalized_name) {
            if variant != entity.normalized_name && !keys.contains(&variant) {
                keys.push(variant);
            }
        }
        keys.sort();
        keys
    }

    /// Exact lookup of a normalized string
    pub fn lookup(&self, normalized: &str) -> Option<Uuid> {
        self.entries.read().get(normalized).copied()
    }

    /// Snapshot of (key, id) pairs sorted by key, for the fuzzy scan
    pub fn snapshot(&self) -> Vec<(String, Uuid)> {
        let mut entries: Vec<(String, Uuid)> = self
            .entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
