//! Canonical exercise entities and their persistent store
//!
//! Entities live in RocksDB under `ex:{id}` with a `name:{normalized}`
//! uniqueness key, mirrored by an in-memory DashMap for read-heavy paths.
//! The store is the single mutation point for entity data; everything else
//! reads through the cache or the identity index.

use anyhow::{anyhow, Context, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Fundamental movement pattern of an exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementPattern {
    Squat,
    Hinge,
    HorizontalPush,
    VerticalPush,
    HorizontalPull,
    VerticalPull,
    Carry,
    Other,
}

impl MovementPattern {
    /// Coarse training category used in client-facing metadata
    pub fn category(&self) -> &'static str {
        match self {
            Self::Squat | Self::Hinge => "legs",
            Self::HorizontalPush | Self::VerticalPush => "push",
            Self::HorizontalPull | Self::VerticalPull => "pull",
            Self::Carry => "carry",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for MovementPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Squat => "squat",
            Self::Hinge => "hinge",
            Self::HorizontalPush => "horizontal_push",
            Self::VerticalPush => "vertical_push",
            Self::HorizontalPull => "horizontal_pull",
            Self::VerticalPull => "vertical_pull",
            Self::Carry => "carry",
            Self::Other => "other",
        };
        write!(f, "{s}")
    }
}

/// Compound vs isolation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mechanic {
    Compound,
    Isolation,
}

impl fmt::Display for Mechanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compound => write!(f, "compound"),
            Self::Isolation => write!(f, "isolation"),
        }
    }
}

/// Difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Beginner => write!(f, "beginner"),
            Self::Intermediate => write!(f, "intermediate"),
            Self::Advanced => write!(f, "advanced"),
        }
    }
}

/// Canonical exercise record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseEntity {
    pub id: Uuid,
    /// Original display name as first seen
    pub display_name: String,
    /// Canonical lookup form; unique per entity
    pub normalized_name: String,
    /// Fixed-length consonant-skeleton code
    pub phonetic_key: String,
    /// Alternate phrasings (normalized)
    pub synonyms: std::collections::BTreeSet<String>,
    pub movement_pattern: MovementPattern,
    /// Canonical equipment token ("dumbbell", "cable", "bodyweight", ...)
    pub primary_equipment: String,
    pub mechanic: Mechanic,
    pub difficulty: Difficulty,
    pub primary_muscles: Vec<String>,
    /// Embedding of the normalized name, used by the semantic stage
    pub embedding: Option<Vec<f32>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

const ENTITY_PREFIX: &str = "ex:";
const NAME_PREFIX: &str = "name:";

/// Persistent entity store with in-memory mirror
///
/// Creation is the only mutation path. `insert_if_absent` holds a creation
/// lock across the check-and-write so two concurrent requests for the same
/// unseen normalized name resolve to exactly one entity; the loser gets the
/// winner's record back, never an error. Creation is rare (a handful per
/// day once the catalog stabilizes), so a single lock is not a bottleneck.
pub struct EntityStore {
    db: Arc<rocksdb::DB>,
    cache: DashMap<Uuid, ExerciseEntity>,
    by_name: DashMap<String, Uuid>,
    create_lock: parking_lot::Mutex<()>,
}

impl EntityStore {
    /// Open (or create) the store at the given path and load all entities
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("creating storage dir {}", path.display()))?;

        let mut opts = rocksdb::Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        let db = Arc::new(
            rocksdb::DB::open(&opts, path.join("exercises"))
                .map_err(|e| anyhow!("opening exercise store: {e}"))?,
        );

        let store = Self {
            db,
            cache: DashMap::new(),
            by_name: DashMap::new(),
            create_lock: parking_lot::Mutex::new(()),
        };
        store.load_all()?;
        Ok(store)
    }

    fn load_all(&self) -> Result<()> {
        let iter = self.db.prefix_iterator(ENTITY_PREFIX.as_bytes());
        for item in iter {
            let (key, value) = item.map_err(|e| anyhow!("iterating exercise store: {e}"))?;
            let key_str = std::str::from_utf8(&key).unwrap_or("");
            if !key_str.starts_with(ENTITY_PREFIX) {
                break;
            }
            let entity: ExerciseEntity =
                bincode::deserialize(&value).context("deserializing exercise entity")?;
            self.by_name
                .insert(entity.normalized_name.clone(), entity.id);
            self.cache.insert(entity.id, entity);
        }
        Ok(())
    }

    /// Number of entities in the store
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Fetch by id
    pub fn get(&self, id: Uuid) -> Option<ExerciseEntity> {
        self.cache.get(&id).map(|e| e.clone())
    }

    /// Fetch by normalized name (the uniqueness key)
    pub fn get_by_normalized(&self, normalized: &str) -> Option<ExerciseEntity> {
        let id = *self.by_name.get(normalized)?;
        self.get(id)
    }

    /// Snapshot of all entities, sorted by normalized name for determinism
    pub fn all(&self) -> Vec<ExerciseEntity> {
        let mut entities: Vec<ExerciseEntity> =
            self.cache.iter().map(|e| e.value().clone()).collect();
        entities.sort_by(|a, b| a.normalized_name.cmp(&b.normalized_name));
        entities
    }

    /// Atomic insert-if-absent keyed by normalized name
    ///
    /// Returns `(entity, created)`. When an entity with the same normalized
    /// name already exists, that entity is returned with `created = false`.
    pub fn insert_if_absent(&self, entity: ExerciseEntity) -> Result<(ExerciseEntity, bool)> {
        let _guard = self.create_lock.lock();

        if let Some(existing) = self.get_by_normalized(&entity.normalized_name) {
            return Ok((existing, false));
        }

        let entity_key = format!("{ENTITY_PREFIX}{}", entity.id);
        let name_key = format!("{NAME_PREFIX}{}", entity.normalized_name);
        let serialized = bincode::serialize(&entity).context("serializing exercise entity")?;

        // Both keys land in one batch so a crash cannot leave the uniqueness
        // key without its entity.
        let mut batch = rocksdb::WriteBatch::default();
        batch.put(entity_key.as_bytes(), &serialized);
        batch.put(name_key.as_bytes(), entity.id.as_bytes());
        self.db
            .write(batch)
            .map_err(|e| anyhow!("persisting exercise entity: {e}"))?;

        self.by_name
            .insert(entity.normalized_name.clone(), entity.id);
        self.cache.insert(entity.id, entity.clone());

        Ok((entity, true))
    }

    /// Flush RocksDB to disk (called during graceful shutdown)
    pub fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| anyhow!("flushing exercise store: {e}"))
    }
}
