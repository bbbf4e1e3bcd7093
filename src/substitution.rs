//! Substitution candidates and context-aware scoring
//!
//! The curated table maps a source exercise to substitutes with base
//! similarity scores. Exercises outside the table (user-created ones)
//! fall back to pattern-derived candidates. The filter applies one hard
//! constraint (equipment, when known) and soft score adjustments for
//! injuries, experience, and program continuity.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::constants::{
    DIFFICULTY_MATCH_WEIGHT, INJURY_RELIEF_WEIGHT, PROGRAM_CONTINUITY_WEIGHT,
};
use crate::context::{EquipmentAvailability, ExperienceLevel, UserContext};
use crate::exercise::{Difficulty, EntityStore, ExerciseEntity};

/// One curated substitution edge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubstitutionEntry {
    pub substitute_id: Uuid,
    /// Base similarity of the substitute to the source, in [0, 1]
    pub base_score: f32,
    /// Body part this substitute relieves, if the edge exists for
    /// injury accommodation ("shoulder" for Overhead Press -> Landmine Press)
    pub reduced_stress_area: Option<String>,
}

/// Curated source -> substitutes mapping, keyed by source entity id
pub struct SubstitutionTable {
    edges: HashMap<Uuid, Vec<SubstitutionEntry>>,
    store: Arc<EntityStore>,
}

impl SubstitutionTable {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self {
            edges: HashMap::new(),
            store,
        }
    }

    pub fn insert(&mut self, source: Uuid, entries: Vec<SubstitutionEntry>) {
        self.edges.insert(source, entries);
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Candidates for a source exercise
    ///
    /// Unknown sources (freshly created entities) derive candidates from
    /// every stored exercise sharing the source's movement pattern.
    pub fn candidates_for(&self, source: &ExerciseEntity) -> Vec<(ExerciseEntity, SubstitutionEntry)> {
        if let Some(entries) = self.edges.get(&source.id) {
            return entries
                .iter()
                .filter_map(|entry| {
                    self.store
                        .get(entry.substitute_id)
                        .map(|entity| (entity, entry.clone()))
                })
                .collect();
        }

        // Derived fallback: same movement pattern, scored by mechanic match
        self.store
            .all()
            .into_iter()
            .filter(|e| e.id != source.id && e.movement_pattern == source.movement_pattern)
            .map(|entity| {
                let base_score = if entity.mechanic == source.mechanic {
                    0.75
                } else {
                    0.60
                };
                let entry = SubstitutionEntry {
                    substitute_id: entity.id,
                    base_score,
                    reduced_stress_area: None,
                };
                (entity, entry)
            })
            .collect()
    }
}

/// A substitute after filtering and scoring
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub entity: ExerciseEntity,
    pub score: f32,
    pub base_score: f32,
    pub reduced_stress_area: Option<String>,
    /// Human-readable reasons behind the score adjustments
    pub why: Vec<String>,
}

/// Applies the hard equipment constraint and soft context boosts
pub struct CandidateFilter;

impl CandidateFilter {
    /// Filter and rank candidates for a user
    ///
    /// Sorted by adjusted score descending; ties break on normalized name
    /// so repeated requests return a stable order.
    pub fn rank(
        candidates: Vec<(ExerciseEntity, SubstitutionEntry)>,
        context: &UserContext,
    ) -> Vec<ScoredCandidate> {
        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .filter(|(entity, _)| context.equipment.allows(&entity.primary_equipment))
            .map(|(entity, entry)| Self::score(entity, entry, context))
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.entity.normalized_name.cmp(&b.entity.normalized_name))
        });
        scored
    }

    fn score(
        entity: ExerciseEntity,
        entry: SubstitutionEntry,
        context: &UserContext,
    ) -> ScoredCandidate {
        let mut score = entry.base_score;
        let mut why = vec![format!(
            "similar {} movement",
            entity.movement_pattern.category()
        )];

        // Injury relief: boost edges tagged for an injured body part
        if let Some(area) = &entry.reduced_stress_area {
            if context.has_injury(area) {
                score += INJURY_RELIEF_WEIGHT;
                why.push(format!("reduces stress on injured {area}"));
            }
        }

        // Difficulty alignment with experience level
        if let Some(experience) = context.program.as_ref().and_then(|p| p.experience) {
            if difficulty_matches(entity.difficulty, experience) {
                score += DIFFICULTY_MATCH_WEIGHT;
                why.push("matches your experience level".to_string());
            }
        }

        // Program continuity: prefer exercises already in the program
        if let Some(program) = &context.program {
            if program.exercise_ids.contains(&entity.id) {
                score += PROGRAM_CONTINUITY_WEIGHT;
                why.push("already in your program".to_string());
            }
        }

        if matches!(context.equipment, EquipmentAvailability::Known(_)) {
            why.push(format!("uses available {}", entity.primary_equipment));
        }

        ScoredCandidate {
            score: score.min(1.0),
            base_score: entry.base_score,
            reduced_stress_area: entry.reduced_stress_area,
            why,
            entity,
        }
    }
}

fn difficulty_matches(difficulty: Difficulty, experience: ExperienceLevel) -> bool {
    matches!(
        (difficulty, experience),
        (Difficulty::Beginner, ExperienceLevel::Novice)
            | (Difficulty::Intermediate, ExperienceLevel::Intermediate)
            | (Difficulty::Advanced, ExperienceLevel::Advanced)
    )
}
