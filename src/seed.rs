//! Seed catalog loaded on first start against an empty store
//!
//! A curated set of common strength-training exercises plus the curated
//! substitution edges between them. The registry is intentionally small:
//! anything outside it enters the system through the create path.

use anyhow::Result;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::embeddings::Embedder;
use crate::exercise::{
    Difficulty, EntityStore, ExerciseEntity, Mechanic, MovementPattern,
};
use crate::normalize::{normalize, phonetic_key};
use crate::substitution::{SubstitutionEntry, SubstitutionTable};

use Difficulty::{Advanced, Beginner, Intermediate};
use Mechanic::{Compound, Isolation};
use MovementPattern::*;

struct SeedSpec {
    name: &'static str,
    synonyms: &'static [&'static str],
    pattern: MovementPattern,
    equipment: &'static str,
    mechanic: Mechanic,
    difficulty: Difficulty,
    muscles: &'static [&'static str],
}

const CATALOG: &[SeedSpec] = &[
    // Horizontal push
    SeedSpec { name: "Barbell Bench Press", synonyms: &["bench press"], pattern: HorizontalPush, equipment: "barbell", mechanic: Compound, difficulty: Intermediate, muscles: &["chest", "triceps", "shoulders"] },
    SeedSpec { name: "Dumbbell Bench Press", synonyms: &[], pattern: HorizontalPush, equipment: "dumbbell", mechanic: Compound, difficulty: Intermediate, muscles: &["chest", "triceps", "shoulders"] },
    SeedSpec { name: "Dumbbell Incline Bench Press", synonyms: &["incline dumbbell press"], pattern: HorizontalPush, equipment: "dumbbell", mechanic: Compound, difficulty: Intermediate, muscles: &["chest", "shoulders", "triceps"] },
    SeedSpec { name: "Machine Chest Press", synonyms: &["chest press machine"], pattern: HorizontalPush, equipment: "machine", mechanic: Compound, difficulty: Beginner, muscles: &["chest", "triceps"] },
    SeedSpec { name: "Push Up", synonyms: &["press up"], pattern: HorizontalPush, equipment: "bodyweight", mechanic: Compound, difficulty: Beginner, muscles: &["chest", "triceps", "core"] },
    SeedSpec { name: "Dumbbell Flye", synonyms: &["chest flye"], pattern: HorizontalPush, equipment: "dumbbell", mechanic: Isolation, difficulty: Beginner, muscles: &["chest"] },
    SeedSpec { name: "Dip", synonyms: &["chest dip"], pattern: HorizontalPush, equipment: "bodyweight", mechanic: Compound, difficulty: Intermediate, muscles: &["chest", "triceps"] },
    // Vertical push
    SeedSpec { name: "Overhead Press", synonyms: &["military press", "standing press"], pattern: VerticalPush, equipment: "barbell", mechanic: Compound, difficulty: Intermediate, muscles: &["shoulders", "triceps"] },
    SeedSpec { name: "Dumbbell Shoulder Press", synonyms: &["seated dumbbell press"], pattern: VerticalPush, equipment: "dumbbell", mechanic: Compound, difficulty: Intermediate, muscles: &["shoulders", "triceps"] },
    SeedSpec { name: "Machine Shoulder Press", synonyms: &[], pattern: VerticalPush, equipment: "machine", mechanic: Compound, difficulty: Beginner, muscles: &["shoulders", "triceps"] },
    SeedSpec { name: "Landmine Press", synonyms: &["angled barbell press"], pattern: VerticalPush, equipment: "landmine", mechanic: Compound, difficulty: Intermediate, muscles: &["shoulders", "chest"] },
    SeedSpec { name: "Dumbbell Lateral Raise", synonyms: &["side raise"], pattern: Other, equipment: "dumbbell", mechanic: Isolation, difficulty: Beginner, muscles: &["shoulders"] },
    SeedSpec { name: "Pike Push Up", synonyms: &[], pattern: VerticalPush, equipment: "bodyweight", mechanic: Compound, difficulty: Intermediate, muscles: &["shoulders", "triceps"] },
    // Squat
    SeedSpec { name: "Back Squat", synonyms: &["barbell squat"], pattern: Squat, equipment: "barbell", mechanic: Compound, difficulty: Intermediate, muscles: &["quads", "glutes"] },
    SeedSpec { name: "Front Squat", synonyms: &[], pattern: Squat, equipment: "barbell", mechanic: Compound, difficulty: Advanced, muscles: &["quads", "core"] },
    SeedSpec { name: "Goblet Squat", synonyms: &[], pattern: Squat, equipment: "dumbbell", mechanic: Compound, difficulty: Beginner, muscles: &["quads", "glutes"] },
    SeedSpec { name: "Leg Press", synonyms: &[], pattern: Squat, equipment: "machine", mechanic: Compound, difficulty: Beginner, muscles: &["quads", "glutes"] },
    SeedSpec { name: "Bulgarian Split Squat", synonyms: &["rear foot elevated split squat"], pattern: Squat, equipment: "dumbbell", mechanic: Compound, difficulty: Intermediate, muscles: &["quads", "glutes"] },
    SeedSpec { name: "Walking Lunge", synonyms: &[], pattern: Squat, equipment: "bodyweight", mechanic: Compound, difficulty: Beginner, muscles: &["quads", "glutes"] },
    // Hinge
    SeedSpec { name: "Conventional Deadlift", synonyms: &["deadlift"], pattern: Hinge, equipment: "barbell", mechanic: Compound, difficulty: Intermediate, muscles: &["hamstrings", "glutes", "lower back"] },
    SeedSpec { name: "Romanian Deadlift", synonyms: &[], pattern: Hinge, equipment: "barbell", mechanic: Compound, difficulty: Intermediate, muscles: &["hamstrings", "glutes"] },
    SeedSpec { name: "Trap Bar Deadlift", synonyms: &["hex bar deadlift"], pattern: Hinge, equipment: "trap bar", mechanic: Compound, difficulty: Beginner, muscles: &["hamstrings", "glutes", "quads"] },
    SeedSpec { name: "Kettlebell Swing", synonyms: &["russian swing"], pattern: Hinge, equipment: "kettlebell", mechanic: Compound, difficulty: Intermediate, muscles: &["glutes", "hamstrings"] },
    SeedSpec { name: "Barbell Hip Thrust", synonyms: &["hip thrust"], pattern: Hinge, equipment: "barbell", mechanic: Compound, difficulty: Beginner, muscles: &["glutes"] },
    SeedSpec { name: "Back Extension", synonyms: &["hyperextension"], pattern: Hinge, equipment: "bodyweight", mechanic: Isolation, difficulty: Beginner, muscles: &["lower back", "glutes"] },
    // Vertical pull
    SeedSpec { name: "Pull Up", synonyms: &[], pattern: VerticalPull, equipment: "bodyweight", mechanic: Compound, difficulty: Intermediate, muscles: &["lats", "biceps"] },
    SeedSpec { name: "Chin Up", synonyms: &[], pattern: VerticalPull, equipment: "bodyweight", mechanic: Compound, difficulty: Intermediate, muscles: &["lats", "biceps"] },
    SeedSpec { name: "Lat Pulldown", synonyms: &["pulldown"], pattern: VerticalPull, equipment: "cable", mechanic: Compound, difficulty: Beginner, muscles: &["lats", "biceps"] },
    SeedSpec { name: "Band Assisted Pull Up", synonyms: &[], pattern: VerticalPull, equipment: "band", mechanic: Compound, difficulty: Beginner, muscles: &["lats", "biceps"] },
    // Horizontal pull
    SeedSpec { name: "Barbell Row", synonyms: &["bent over row"], pattern: HorizontalPull, equipment: "barbell", mechanic: Compound, difficulty: Intermediate, muscles: &["upper back", "lats", "biceps"] },
    SeedSpec { name: "Dumbbell Row", synonyms: &["one arm dumbbell row"], pattern: HorizontalPull, equipment: "dumbbell", mechanic: Compound, difficulty: Beginner, muscles: &["upper back", "lats", "biceps"] },
    SeedSpec { name: "Seated Cable Row", synonyms: &["cable row"], pattern: HorizontalPull, equipment: "cable", mechanic: Compound, difficulty: Beginner, muscles: &["upper back", "lats"] },
    SeedSpec { name: "Chest Supported Row", synonyms: &[], pattern: HorizontalPull, equipment: "dumbbell", mechanic: Compound, difficulty: Beginner, muscles: &["upper back", "lats"] },
    SeedSpec { name: "Inverted Row", synonyms: &["bodyweight row"], pattern: HorizontalPull, equipment: "bodyweight", mechanic: Compound, difficulty: Beginner, muscles: &["upper back", "biceps"] },
    SeedSpec { name: "Face Pull", synonyms: &[], pattern: HorizontalPull, equipment: "cable", mechanic: Isolation, difficulty: Beginner, muscles: &["rear delts", "upper back"] },
    // Arms and accessories
    SeedSpec { name: "Barbell Curl", synonyms: &[], pattern: Other, equipment: "barbell", mechanic: Isolation, difficulty: Beginner, muscles: &["biceps"] },
    SeedSpec { name: "Dumbbell Curl", synonyms: &["bicep curl"], pattern: Other, equipment: "dumbbell", mechanic: Isolation, difficulty: Beginner, muscles: &["biceps"] },
    SeedSpec { name: "Cable Tricep Pushdown", synonyms: &["tricep pushdown"], pattern: Other, equipment: "cable", mechanic: Isolation, difficulty: Beginner, muscles: &["triceps"] },
    SeedSpec { name: "Skull Crusher", synonyms: &["lying tricep extension"], pattern: Other, equipment: "ez bar", mechanic: Isolation, difficulty: Intermediate, muscles: &["triceps"] },
    // Carry and core
    SeedSpec { name: "Farmer Carry", synonyms: &["farmers walk"], pattern: Carry, equipment: "dumbbell", mechanic: Compound, difficulty: Beginner, muscles: &["forearms", "core"] },
    SeedSpec { name: "Plank", synonyms: &[], pattern: Other, equipment: "bodyweight", mechanic: Isolation, difficulty: Beginner, muscles: &["core"] },
];

/// Curated substitution edges, by display name
///
/// Third tuple field is the body part the substitute relieves, when the
/// edge exists for injury accommodation.
const SUBSTITUTIONS: &[(&str, &[(&str, f32, Option<&str>)])] = &[
    ("Overhead Press", &[
        ("Dumbbell Shoulder Press", 0.92, None),
        ("Machine Shoulder Press", 0.88, None),
        ("Landmine Press", 0.85, Some("shoulder")),
        ("Pike Push Up", 0.70, None),
    ]),
    ("Barbell Bench Press", &[
        ("Dumbbell Bench Press", 0.93, None),
        ("Machine Chest Press", 0.85, Some("shoulder")),
        ("Push Up", 0.75, None),
        ("Dip", 0.72, None),
    ]),
    ("Dumbbell Bench Press", &[
        ("Barbell Bench Press", 0.93, None),
        ("Machine Chest Press", 0.86, Some("shoulder")),
        ("Dumbbell Incline Bench Press", 0.84, None),
        ("Push Up", 0.75, None),
    ]),
    ("Back Squat", &[
        ("Front Squat", 0.90, None),
        ("Goblet Squat", 0.85, Some("lower back")),
        ("Leg Press", 0.82, Some("lower back")),
        ("Bulgarian Split Squat", 0.78, None),
        ("Walking Lunge", 0.72, None),
    ]),
    ("Conventional Deadlift", &[
        ("Trap Bar Deadlift", 0.92, Some("lower back")),
        ("Romanian Deadlift", 0.88, None),
        ("Barbell Hip Thrust", 0.78, Some("lower back")),
        ("Kettlebell Swing", 0.72, None),
    ]),
    ("Pull Up", &[
        ("Chin Up", 0.93, None),
        ("Lat Pulldown", 0.90, Some("elbow")),
        ("Band Assisted Pull Up", 0.85, None),
        ("Inverted Row", 0.72, None),
    ]),
    ("Barbell Row", &[
        ("Dumbbell Row", 0.92, Some("lower back")),
        ("Chest Supported Row", 0.90, Some("lower back")),
        ("Seated Cable Row", 0.88, None),
        ("Inverted Row", 0.75, None),
    ]),
    ("Dumbbell Flye", &[
        ("Machine Chest Press", 0.70, None),
        ("Push Up", 0.65, None),
    ]),
];

fn build_entity(spec: &SeedSpec, embedder: &dyn Embedder) -> Result<ExerciseEntity> {
    let normalized = normalize(spec.name);
    let embedding = embedder.encode(&normalized)?;
    Ok(ExerciseEntity {
        id: Uuid::new_v4(),
        display_name: spec.name.to_string(),
        normalized_name: normalized.clone(),
        phonetic_key: phonetic_key(&normalized),
        synonyms: spec.synonyms.iter().map(|s| normalize(s)).collect::<BTreeSet<_>>(),
        movement_pattern: spec.pattern,
        primary_equipment: spec.equipment.to_string(),
        mechanic: spec.mechanic,
        difficulty: spec.difficulty,
        primary_muscles: spec.muscles.iter().map(|s| s.to_string()).collect(),
        embedding: Some(embedding),
        created_at: chrono::Utc::now(),
    })
}

/// Populate an empty store with the seed catalog
pub fn seed_store(store: &EntityStore, embedder: &dyn Embedder) -> Result<usize> {
    let mut inserted = 0;
    for spec in CATALOG {
        let entity = build_entity(spec, embedder)?;
        let (_, created) = store.insert_if_absent(entity)?;
        if created {
            inserted += 1;
        }
    }
    store.flush()?;
    tracing::info!(count = inserted, "seeded exercise catalog");
    Ok(inserted)
}

/// Build the curated substitution table against a seeded store
pub fn seed_substitutions(store: Arc<EntityStore>) -> SubstitutionTable {
    let mut table = SubstitutionTable::new(store.clone());

    for (source_name, edges) in SUBSTITUTIONS {
        let Some(source) = store.get_by_normalized(&normalize(source_name)) else {
            tracing::warn!(name = source_name, "substitution source missing from catalog");
            continue;
        };
        let entries: Vec<SubstitutionEntry> = edges
            .iter()
            .filter_map(|(sub_name, base_score, area)| {
                let substitute = store.get_by_normalized(&normalize(sub_name))?;
                Some(SubstitutionEntry {
                    substitute_id: substitute.id,
                    base_score: *base_score,
                    reduced_stress_area: area.map(str::to_string),
                })
            })
            .collect();
        table.insert(source.id, entries);
    }

    table
}
