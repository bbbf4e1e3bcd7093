//! Request and response types for the HTTP API

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::exercise::ExerciseEntity;
use crate::service::{Recommendation, ResolveOutcome, SubstituteOutcome};

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub name: String,
    /// Create an entity when no stage matches (default true)
    #[serde(default = "default_true")]
    pub auto_create: bool,
    /// Per-request fuzzy threshold override in [0, 1]
    #[serde(default)]
    pub fuzzy_threshold: Option<f32>,
    /// Ask the generative service for extra phrasings (flag-gated)
    #[serde(default)]
    pub use_generative_synonyms: bool,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub success: bool,
    pub entity_id: Option<Uuid>,
    pub matched_name: Option<String>,
    pub match_stage: String,
    pub match_score: Option<f32>,
    pub synonyms: Vec<String>,
    pub created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ExerciseMetadata>,
}

impl From<ResolveOutcome> for ResolveResponse {
    fn from(outcome: ResolveOutcome) -> Self {
        let success = outcome.success();
        let match_stage = outcome.stage.as_label().to_string();
        match outcome.entity {
            Some(entity) => Self {
                success,
                entity_id: Some(entity.id),
                matched_name: Some(entity.display_name.clone()),
                match_stage,
                match_score: outcome.score,
                synonyms: entity.synonyms.iter().cloned().collect(),
                created: outcome.created,
                metadata: Some(ExerciseMetadata::from(entity)),
            },
            None => Self {
                success,
                entity_id: None,
                matched_name: None,
                match_stage,
                match_score: None,
                synonyms: Vec::new(),
                created: false,
                metadata: None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExerciseMetadata {
    pub movement_pattern: String,
    pub category: String,
    pub primary_equipment: String,
    pub mechanic: String,
    pub difficulty: String,
    pub primary_muscles: Vec<String>,
}

impl From<ExerciseEntity> for ExerciseMetadata {
    fn from(entity: ExerciseEntity) -> Self {
        Self {
            movement_pattern: entity.movement_pattern.to_string(),
            category: entity.movement_pattern.category().to_string(),
            primary_equipment: entity.primary_equipment,
            mechanic: entity.mechanic.to_string(),
            difficulty: entity.difficulty.to_string(),
            primary_muscles: entity.primary_muscles,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubstituteRequest {
    pub exercise_name: String,
    /// Free-text reason for the swap, logged but not scored
    #[serde(default)]
    pub reason: Option<String>,
    /// Body part to treat as injured for this request
    #[serde(default)]
    pub injured_body_part: Option<String>,
    /// Return the expanded candidate list
    #[serde(default)]
    pub show_more: bool,
}

#[derive(Debug, Serialize)]
pub struct SubstituteResponse {
    pub original_exercise: String,
    pub substitutes: Vec<CandidateDto>,
    pub total_found: usize,
    pub message: String,
    pub show_more_available: bool,
    pub context_aware: bool,
    pub reranked: bool,
}

impl From<SubstituteOutcome> for SubstituteResponse {
    fn from(outcome: SubstituteOutcome) -> Self {
        let substitutes: Vec<CandidateDto> = outcome
            .recommendations
            .into_iter()
            .map(CandidateDto::from)
            .collect();
        let message = if substitutes.is_empty() {
            format!("No substitutes found for {}", outcome.source.display_name)
        } else {
            format!(
                "Found {} substitutes for {}",
                substitutes.len(),
                outcome.source.display_name
            )
        };
        Self {
            original_exercise: outcome.source.display_name,
            show_more_available: outcome.total_found > substitutes.len(),
            total_found: outcome.total_found,
            message,
            substitutes,
            context_aware: outcome.context_aware,
            reranked: outcome.reranked,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CandidateDto {
    pub id: Uuid,
    pub substitute_name: String,
    pub similarity_score: f32,
    pub why_recommended: Vec<String>,
    pub movement_pattern: String,
    pub primary_muscles: Vec<String>,
    pub equipment_required: String,
    pub difficulty_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduced_stress_area: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_rationale: Option<String>,
}

impl From<Recommendation> for CandidateDto {
    fn from(rec: Recommendation) -> Self {
        let candidate = rec.candidate;
        Self {
            id: candidate.entity.id,
            substitute_name: candidate.entity.display_name,
            similarity_score: candidate.score,
            why_recommended: candidate.why,
            movement_pattern: candidate.entity.movement_pattern.to_string(),
            primary_muscles: candidate.entity.primary_muscles,
            equipment_required: candidate.entity.primary_equipment,
            difficulty_level: candidate.entity.difficulty.to_string(),
            reduced_stress_area: candidate.reduced_stress_area,
            rerank_rationale: rec.rerank_rationale,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FlagResponse {
    pub name: String,
    pub enabled_for_user: bool,
    pub rollout_percentage: f32,
}
