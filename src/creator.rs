//! Entity creation for names no stage could resolve
//!
//! Structural metadata is inferred from the same vocabulary the synonym
//! table speaks: equipment tokens, movement keywords, isolation markers.
//! Insertion goes through the store's insert-if-absent so creation races
//! on the same normalized name collapse to a single entity.

use anyhow::Result;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::embeddings::Embedder;
use crate::exercise::{Difficulty, EntityStore, ExerciseEntity, Mechanic, MovementPattern};
use crate::index::IdentityIndex;
use crate::normalize::{normalize, phonetic_key};

/// Equipment tokens in priority order; the first token found in the name
/// wins ("smith machine bench" is a machine movement, not a barbell one).
const EQUIPMENT_KEYWORDS: &[(&str, &str)] = &[
    ("smith", "machine"),
    ("machine", "machine"),
    ("cable", "cable"),
    ("dumbbell", "dumbbell"),
    ("barbell", "barbell"),
    ("kettlebell", "kettlebell"),
    ("trap bar", "trap bar"),
    ("hex bar", "trap bar"),
    ("ez bar", "ez bar"),
    ("landmine", "landmine"),
    ("band", "band"),
    ("resistance band", "band"),
    ("sled", "sled"),
    ("bodyweight", "bodyweight"),
];

/// Isolation markers; anything else defaults to compound
const ISOLATION_KEYWORDS: &[&str] = &[
    "curl",
    "flye",
    "fly",
    "extension",
    "raise",
    "pushdown",
    "press down",
    "kickback",
    "shrug",
    "pullover",
    "crunch",
];

/// Advanced-movement markers
const ADVANCED_KEYWORDS: &[&str] = &[
    "pistol",
    "muscle up",
    "planche",
    "snatch",
    "clean and jerk",
    "front lever",
    "handstand",
    "nordic",
];

pub struct EntityCreator {
    store: Arc<EntityStore>,
    index: Arc<IdentityIndex>,
    embedder: Arc<dyn Embedder>,
}

impl EntityCreator {
    pub fn new(
        store: Arc<EntityStore>,
        index: Arc<IdentityIndex>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            store,
            index,
            embedder,
        }
    }

    /// Synthesize and insert an entity for an unresolved name
    ///
    /// Returns `(entity, created)`; `created = false` means another request
    /// won the race and this call received the winner's record.
    pub fn create(&self, raw_name: &str, synonyms: &BTreeSet<String>) -> Result<(ExerciseEntity, bool)> {
        let normalized = normalize(raw_name);
        let embedding = self.embedder.encode(&normalized)?;
        let movement_pattern = infer_movement_pattern(&normalized);

        let entity = ExerciseEntity {
            id: Uuid::new_v4(),
            display_name: title_case(raw_name),
            normalized_name: normalized.clone(),
            phonetic_key: phonetic_key(&normalized),
            synonyms: synonyms
                .iter()
                .filter(|s| **s != normalized && !s.is_empty())
                .cloned()
                .collect(),
            movement_pattern,
            primary_equipment: infer_equipment(&normalized).to_string(),
            mechanic: infer_mechanic(&normalized),
            difficulty: infer_difficulty(&normalized),
            primary_muscles: infer_muscles(movement_pattern, &normalized),
            embedding: Some(embedding),
            created_at: chrono::Utc::now(),
        };

        let (entity, created) = self.store.insert_if_absent(entity)?;
        if created {
            self.index.insert_entity(&entity);
            tracing::info!(
                name = %entity.display_name,
                pattern = %entity.movement_pattern,
                equipment = %entity.primary_equipment,
                "created exercise entity"
            );
        } else {
            crate::metrics::ENTITY_CREATE_RACES_TOTAL.inc();
            tracing::debug!(
                name = %entity.display_name,
                "creation race resolved to existing entity"
            );
        }

        Ok((entity, created))
    }
}

fn contains_token(name: &str, keyword: &str) -> bool {
    format!(" {name} ").contains(&format!(" {keyword} "))
}

/// Infer the canonical equipment token from the name
pub fn infer_equipment(normalized: &str) -> &'static str {
    for (keyword, equipment) in EQUIPMENT_KEYWORDS {
        if contains_token(normalized, keyword) {
            return equipment;
        }
    }

    // Short forms that survive normalization unexpanded
    if contains_token(normalized, "db") {
        return "dumbbell";
    }
    if contains_token(normalized, "bb") {
        return "barbell";
    }
    if contains_token(normalized, "kb") {
        return "kettlebell";
    }

    "bodyweight"
}

/// Infer the movement pattern from name keywords
pub fn infer_movement_pattern(normalized: &str) -> MovementPattern {
    let has = |kw: &str| contains_token(normalized, kw) || normalized.contains(kw);

    if has("squat") || has("lunge") || has("leg press") || has("step up") {
        MovementPattern::Squat
    } else if has("deadlift")
        || has("hinge")
        || has("hip thrust")
        || has("swing")
        || has("good morning")
        || has("rdl")
        || has("back extension")
    {
        MovementPattern::Hinge
    } else if has("pulldown") || has("pull up") || has("pullup") || has("chin up") || has("chinup")
    {
        MovementPattern::VerticalPull
    } else if has("row") || has("face pull") || has("rear delt") {
        MovementPattern::HorizontalPull
    } else if has("overhead press")
        || has("shoulder press")
        || has("military")
        || has("handstand")
        || has("ohp")
    {
        MovementPattern::VerticalPush
    } else if has("bench") || has("push up") || has("pushup") || has("dip") || has("flye")
        || has("fly") || has("crossover") || has("chest press")
    {
        MovementPattern::HorizontalPush
    } else if has("carry") || has("walk") && has("farmer") {
        MovementPattern::Carry
    } else {
        MovementPattern::Other
    }
}

/// Infer compound vs isolation
pub fn infer_mechanic(normalized: &str) -> Mechanic {
    for keyword in ISOLATION_KEYWORDS {
        if normalized.contains(keyword) {
            return Mechanic::Isolation;
        }
    }
    Mechanic::Compound
}

/// Infer difficulty; machine and band work defaults easier
pub fn infer_difficulty(normalized: &str) -> Difficulty {
    for keyword in ADVANCED_KEYWORDS {
        if normalized.contains(keyword) {
            return Difficulty::Advanced;
        }
    }
    if normalized.contains("machine") || normalized.contains("band") {
        return Difficulty::Beginner;
    }
    Difficulty::Intermediate
}

/// Coarse primary-muscle inference from pattern plus name hints
pub fn infer_muscles(pattern: MovementPattern, normalized: &str) -> Vec<String> {
    let base: &[&str] = match pattern {
        MovementPattern::Squat => &["quads", "glutes"],
        MovementPattern::Hinge => &["hamstrings", "glutes", "lower back"],
        MovementPattern::HorizontalPush => &["chest", "triceps", "shoulders"],
        MovementPattern::VerticalPush => &["shoulders", "triceps"],
        MovementPattern::HorizontalPull => &["upper back", "lats", "biceps"],
        MovementPattern::VerticalPull => &["lats", "biceps"],
        MovementPattern::Carry => &["forearms", "core"],
        MovementPattern::Other => &[],
    };

    let mut muscles: Vec<String> = base.iter().map(|s| s.to_string()).collect();

    if muscles.is_empty() {
        if normalized.contains("curl") {
            muscles.push("biceps".to_string());
        } else if normalized.contains("tricep") || normalized.contains("pushdown") {
            muscles.push("triceps".to_string());
        } else if normalized.contains("calf") {
            muscles.push("calves".to_string());
        } else if normalized.contains("ab") || normalized.contains("crunch") || normalized.contains("plank") {
            muscles.push("core".to_string());
        }
    }

    muscles
}

/// Title-case a display name from raw (possibly lower-case voice) input
fn title_case(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
