//! Request orchestration: resolve-or-create and substitute recommendation
//!
//! The service owns every component and is the only layer the HTTP
//! handlers talk to. It validates input, runs the match cascade, creates
//! entities when allowed, gathers user context, filters and ranks
//! candidates, and applies the optional AI rerank with a hard timeout.

use std::sync::Arc;
use std::time::Duration;

use crate::config::ServerConfig;
use crate::constants::{
    DEFAULT_SUBSTITUTE_COUNT, EXPANDED_SUBSTITUTE_COUNT, FLAG_AI_RERANK,
    FLAG_CONTEXT_AWARE, FLAG_GENERATIVE_SYNONYMS, RERANK_MIN_CANDIDATES,
};
use crate::context::{ContextGatherer, ContextStore, Injury, InjurySeverity, UserContext};
use crate::creator::EntityCreator;
use crate::embeddings::{Embedder, HashEmbedder};
use crate::errors::{AppError, Result};
use crate::exercise::{EntityStore, ExerciseEntity};
use crate::flags::{FeatureFlag, FlagStore, InMemoryFlagStore, RolloutGate};
use crate::index::IdentityIndex;
use crate::matching::{CascadeMatch, MatchCascade, MatchOptions, MatchQuery, MatchStageKind};
use crate::normalize::normalize;
use crate::reranker::{apply_rerank, LlmReranker, Reranker};
use crate::seed;
use crate::substitution::{CandidateFilter, ScoredCandidate, SubstitutionTable};
use crate::synonyms::{expand, GenerativeSynonyms};
use crate::validation::{validate_body_part, validate_exercise_name, validate_user_id};

/// Resolve request options beyond the name itself
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub auto_create: bool,
    /// Per-request fuzzy threshold override
    pub fuzzy_threshold: Option<f32>,
    /// Ask the generative service for extra phrasings (still flag-gated)
    pub use_generative_synonyms: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            auto_create: true,
            fuzzy_threshold: None,
            use_generative_synonyms: false,
        }
    }
}

/// Outcome of resolve-or-create
#[derive(Debug, Clone)]
pub struct ResolveOutcome {
    pub entity: Option<ExerciseEntity>,
    pub stage: MatchStageKind,
    pub score: Option<f32>,
    /// True when this request created the entity
    pub created: bool,
}

impl ResolveOutcome {
    pub fn success(&self) -> bool {
        self.entity.is_some()
    }
}

/// One recommended substitute after filtering, ranking and optional rerank
#[derive(Debug, Clone)]
pub struct Recommendation {
    pub candidate: ScoredCandidate,
    pub rerank_rationale: Option<String>,
}

/// Substitute recommendations plus how they were produced
#[derive(Debug, Clone)]
pub struct SubstituteOutcome {
    pub source: ExerciseEntity,
    pub recommendations: Vec<Recommendation>,
    /// Candidate count before truncation to the requested page size
    pub total_found: usize,
    pub context_aware: bool,
    pub reranked: bool,
}

pub struct ExerciseService {
    store: Arc<EntityStore>,
    cascade: MatchCascade,
    creator: EntityCreator,
    table: SubstitutionTable,
    gatherer: ContextGatherer,
    pub gate: RolloutGate,
    reranker: Option<Arc<dyn Reranker>>,
    generative: Option<GenerativeSynonyms>,
    match_options: MatchOptions,
    rerank_timeout: Duration,
}

impl ExerciseService {
    /// Open storage, seed an empty catalog, and wire every component
    pub fn bootstrap(config: &ServerConfig) -> Result<Self> {
        let store = Arc::new(
            EntityStore::open(&config.storage_path)
                .map_err(|e| AppError::StorageError(e.to_string()))?,
        );
        let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::default());

        if store.len() == 0 {
            seed::seed_store(&store, embedder.as_ref())
                .map_err(|e| AppError::StorageError(e.to_string()))?;
        }

        let index = Arc::new(IdentityIndex::new());
        index.rebuild(&store.all());

        let context_store: Arc<dyn ContextStore> =
            Arc::new(crate::context::InMemoryContextStore::new());
        let flag_store: Arc<dyn FlagStore> = {
            let flags = InMemoryFlagStore::new();
            flags.set_flag(FeatureFlag::full(FLAG_CONTEXT_AWARE));
            flags.set_flag(FeatureFlag::partial(FLAG_AI_RERANK, 0.0, true));
            flags.set_flag(FeatureFlag::partial(FLAG_GENERATIVE_SYNONYMS, 0.0, true));
            Arc::new(flags)
        };

        let rerank_timeout = Duration::from_secs(config.rerank_timeout_secs);
        let reranker: Option<Arc<dyn Reranker>> = LlmReranker::from_config(
            &config.generative_endpoint,
            &config.generative_model,
            rerank_timeout,
        )
        .map(|r| Arc::new(r) as Arc<dyn Reranker>);

        Ok(Self {
            cascade: MatchCascade::new(store.clone(), index.clone(), embedder.clone()),
            creator: EntityCreator::new(store.clone(), index.clone(), embedder.clone()),
            table: seed::seed_substitutions(store.clone()),
            gatherer: ContextGatherer::new(
                context_store,
                Duration::from_millis(config.context_timeout_ms),
            ),
            gate: RolloutGate::new(flag_store, Duration::from_secs(config.flag_cache_ttl_secs)),
            generative: GenerativeSynonyms::from_config(
                &config.generative_endpoint,
                &config.generative_model,
            ),
            match_options: MatchOptions {
                fuzzy_threshold: config.fuzzy_threshold,
                semantic_threshold: config.semantic_threshold,
            },
            reranker,
            store,
            rerank_timeout,
        })
    }

    /// Variant used by tests to inject component doubles
    #[doc(hidden)]
    pub fn with_components(
        store: Arc<EntityStore>,
        index: Arc<IdentityIndex>,
        embedder: Arc<dyn Embedder>,
        table: SubstitutionTable,
        context_store: Arc<dyn ContextStore>,
        flag_store: Arc<dyn FlagStore>,
        reranker: Option<Arc<dyn Reranker>>,
        match_options: MatchOptions,
        rerank_timeout: Duration,
    ) -> Self {
        Self {
            cascade: MatchCascade::new(store.clone(), index.clone(), embedder.clone()),
            creator: EntityCreator::new(store.clone(), index.clone(), embedder),
            table,
            gatherer: ContextGatherer::new(context_store, Duration::from_millis(1_500)),
            gate: RolloutGate::new(flag_store, Duration::from_secs(300)),
            generative: None,
            match_options,
            reranker,
            store,
            rerank_timeout,
        }
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    pub fn flush(&self) -> Result<()> {
        self.store
            .flush()
            .map_err(|e| AppError::StorageError(e.to_string()))
    }

    /// Resolve a spoken exercise name, creating an entity when allowed
    pub async fn resolve_or_create(
        &self,
        raw_name: &str,
        user_id: &str,
        opts: &ResolveOptions,
    ) -> Result<ResolveOutcome> {
        validate_exercise_name(raw_name)
            .map_err(|e| AppError::InvalidExerciseName(e.to_string()))?;
        validate_user_id(user_id).map_err(|e| AppError::InvalidUserId(e.to_string()))?;

        let normalized = normalize(raw_name);
        let mut variants = expand(raw_name);

        if opts.use_generative_synonyms
            && self.gate.is_enabled(FLAG_GENERATIVE_SYNONYMS, user_id)
        {
            if let Some(generative) = &self.generative {
                for proposal in generative.propose(raw_name).await {
                    variants.insert(proposal);
                }
            }
        }

        let query = MatchQuery {
            raw: raw_name.to_string(),
            normalized: normalized.clone(),
            variants,
        };
        let match_options = MatchOptions {
            fuzzy_threshold: opts
                .fuzzy_threshold
                .unwrap_or(self.match_options.fuzzy_threshold),
            semantic_threshold: self.match_options.semantic_threshold,
        };

        if let Some(found) = self.cascade.resolve(&query, &match_options)? {
            return Ok(self.outcome_from_match(found));
        }

        if !opts.auto_create {
            crate::metrics::RESOLVE_TOTAL.with_label_values(&["none"]).inc();
            tracing::debug!(name = %raw_name, "no match and creation disabled");
            return Ok(ResolveOutcome {
                entity: None,
                stage: MatchStageKind::None,
                score: None,
                created: false,
            });
        }

        let (entity, created) = self
            .creator
            .create(raw_name, &query.variants)
            .map_err(|e| AppError::StorageError(e.to_string()))?;
        crate::metrics::RESOLVE_TOTAL
            .with_label_values(&["created"])
            .inc();
        Ok(ResolveOutcome {
            entity: Some(entity),
            stage: MatchStageKind::Created,
            score: None,
            created,
        })
    }

    fn outcome_from_match(&self, found: CascadeMatch) -> ResolveOutcome {
        crate::metrics::RESOLVE_TOTAL
            .with_label_values(&[found.stage.as_label()])
            .inc();
        let entity = self.store.get(found.id);
        if entity.is_none() {
            // Index pointed at an id the store no longer has; treat as miss
            tracing::warn!(id = %found.id, "index entry without stored entity");
        }
        ResolveOutcome {
            entity,
            stage: found.stage,
            score: Some(found.score),
            created: false,
        }
    }

    /// Recommend substitutes for a named exercise
    ///
    /// The source must already resolve (creation is disabled on this path).
    /// Context-aware ranking and AI rerank are both flag-gated; with every
    /// flag off this degrades to the curated base-score ordering.
    pub async fn recommend_substitutes(
        &self,
        raw_name: &str,
        user_id: &str,
        injured_body_part: Option<&str>,
        show_more: bool,
    ) -> Result<SubstituteOutcome> {
        validate_exercise_name(raw_name)
            .map_err(|e| AppError::InvalidExerciseName(e.to_string()))?;
        validate_user_id(user_id).map_err(|e| AppError::InvalidUserId(e.to_string()))?;
        if let Some(part) = injured_body_part {
            validate_body_part(part).map_err(|e| AppError::InvalidInput {
                field: "injured_body_part".to_string(),
                reason: e.to_string(),
            })?;
        }

        let resolved = self
            .resolve_or_create(
                raw_name,
                user_id,
                &ResolveOptions {
                    auto_create: false,
                    ..Default::default()
                },
            )
            .await?;
        let source = resolved
            .entity
            .ok_or_else(|| AppError::ExerciseNotFound(raw_name.to_string()))?;

        let context_aware = self.gate.is_enabled(FLAG_CONTEXT_AWARE, user_id);
        let mut context = if context_aware {
            self.gatherer.gather(user_id).await
        } else {
            UserContext::anonymous(user_id)
        };

        // A body part stated in the request counts as an injury even when
        // the stored context has none
        if let Some(part) = injured_body_part {
            if !context.has_injury(part) {
                context.injuries.push(Injury {
                    body_part: part.to_lowercase(),
                    severity: InjurySeverity::Moderate,
                });
            }
        }

        let candidates = self.table.candidates_for(&source);
        let mut ranked = CandidateFilter::rank(candidates, &context);
        let total_found = ranked.len();

        let count = if show_more {
            EXPANDED_SUBSTITUTE_COUNT
        } else {
            DEFAULT_SUBSTITUTE_COUNT
        };
        ranked.truncate(count);

        let (recommendations, reranked) = self
            .maybe_rerank(&source.display_name, ranked, &context)
            .await;

        Ok(SubstituteOutcome {
            source,
            recommendations,
            total_found,
            context_aware,
            reranked,
        })
    }

    async fn maybe_rerank(
        &self,
        source_name: &str,
        ranked: Vec<ScoredCandidate>,
        context: &UserContext,
    ) -> (Vec<Recommendation>, bool) {
        // Premium users get the rerank even below the candidate minimum
        let eligible = (ranked.len() >= RERANK_MIN_CANDIDATES
            || self.gate.is_premium(&context.user_id))
            && self.gate.is_enabled(FLAG_AI_RERANK, &context.user_id);

        let reranker = match (&self.reranker, eligible) {
            (Some(r), true) => r,
            _ => {
                return (
                    ranked
                        .into_iter()
                        .map(|candidate| Recommendation {
                            candidate,
                            rerank_rationale: None,
                        })
                        .collect(),
                    false,
                )
            }
        };

        let order = match tokio::time::timeout(
            self.rerank_timeout,
            reranker.rerank(source_name, &ranked, context),
        )
        .await
        {
            Ok(order) if !order.is_empty() => order,
            Ok(_) => {
                crate::metrics::RERANK_FALLBACKS_TOTAL.inc();
                tracing::debug!(source = %source_name, "reranker had no opinion");
                Vec::new()
            }
            Err(_) => {
                crate::metrics::RERANK_FALLBACKS_TOTAL.inc();
                tracing::warn!(source = %source_name, "rerank timed out, keeping deterministic order");
                Vec::new()
            }
        };

        let reranked = !order.is_empty();
        let recommendations = apply_rerank(ranked, &order)
            .into_iter()
            .map(|(candidate, rationale)| Recommendation {
                candidate,
                rerank_rationale: rationale,
            })
            .collect();
        (recommendations, reranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::InMemoryContextStore;
    use crate::embeddings::HashEmbedder;
    use crate::errors::AppError;
    use tempfile::TempDir;

    fn service() -> (ExerciseService, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(EntityStore::open(dir.path()).unwrap());
        let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::default());
        seed::seed_store(&store, embedder.as_ref()).unwrap();
        let index = Arc::new(IdentityIndex::new());
        index.rebuild(&store.all());
        let table = seed::seed_substitutions(store.clone());

        let flags = InMemoryFlagStore::new();
        flags.set_flag(FeatureFlag::full(FLAG_CONTEXT_AWARE));
        flags.set_flag(FeatureFlag::partial(FLAG_AI_RERANK, 0.0, true));

        let svc = ExerciseService::with_components(
            store,
            index,
            embedder,
            table,
            Arc::new(InMemoryContextStore::new()),
            Arc::new(flags),
            None,
            MatchOptions {
                fuzzy_threshold: crate::constants::DEFAULT_FUZZY_THRESHOLD,
                semantic_threshold: crate::constants::SEMANTIC_ACCEPT_THRESHOLD,
            },
            Duration::from_secs(1),
        );
        (svc, dir)
    }

    #[tokio::test]
    async fn test_resolve_exact_synonym() {
        let (svc, _dir) = service();
        let outcome = svc
            .resolve_or_create("OHP", "u1", &ResolveOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome.stage, MatchStageKind::Exact);
        assert_eq!(
            outcome.entity.unwrap().display_name,
            "Overhead Press"
        );
    }

    #[tokio::test]
    async fn test_resolve_fuzzy_db_flat_bench() {
        let (svc, _dir) = service();
        let outcome = svc
            .resolve_or_create("DB Flat Bench", "u1", &ResolveOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome.stage, MatchStageKind::Fuzzy);
        assert!(outcome.score.unwrap() >= 0.80);
        assert_eq!(
            outcome.entity.unwrap().display_name,
            "Dumbbell Bench Press"
        );
    }

    #[tokio::test]
    async fn test_resolve_creates_unseen_exercise() {
        let (svc, _dir) = service();
        let outcome = svc
            .resolve_or_create("Cable Chest Flye", "u1", &ResolveOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome.stage, MatchStageKind::Created);
        assert!(outcome.created);
        let entity = outcome.entity.unwrap();
        assert_eq!(entity.primary_equipment, "cable");

        // Second resolution finds the created entity exactly
        let again = svc
            .resolve_or_create("Cable Chest Flye", "u1", &ResolveOptions::default())
            .await
            .unwrap();
        assert_eq!(again.stage, MatchStageKind::Exact);
        assert_eq!(again.entity.unwrap().id, entity.id);
    }

    #[tokio::test]
    async fn test_resolve_no_auto_create() {
        let (svc, _dir) = service();
        let before = svc.store().len();
        let outcome = svc
            .resolve_or_create(
                "Unknown Movement",
                "u1",
                &ResolveOptions {
                    auto_create: false,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!outcome.success());
        assert_eq!(outcome.stage, MatchStageKind::None);
        assert_eq!(svc.store().len(), before);
    }

    #[tokio::test]
    async fn test_substitutes_for_unknown_source_errors() {
        let (svc, _dir) = service();
        let err = svc
            .recommend_substitutes("Totally Unknown Movement", "u1", None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ExerciseNotFound(_)));
    }

    #[tokio::test]
    async fn test_substitutes_shoulder_injury_reorders() {
        let (svc, _dir) = service();
        let outcome = svc
            .recommend_substitutes("Overhead Press", "u1", Some("shoulder"), false)
            .await
            .unwrap();

        assert!(outcome.context_aware);
        assert!(!outcome.reranked);
        assert_eq!(
            outcome.recommendations[0].candidate.entity.display_name,
            "Landmine Press"
        );
    }

    #[tokio::test]
    async fn test_substitutes_default_and_expanded_counts() {
        let (svc, _dir) = service();
        let short = svc
            .recommend_substitutes("Back Squat", "u1", None, false)
            .await
            .unwrap();
        assert!(short.recommendations.len() <= DEFAULT_SUBSTITUTE_COUNT);

        let long = svc
            .recommend_substitutes("Back Squat", "u1", None, true)
            .await
            .unwrap();
        assert!(long.recommendations.len() >= short.recommendations.len());
    }

    #[tokio::test]
    async fn test_substitutes_for_created_exercise_derive_from_pattern() {
        let (svc, _dir) = service();
        svc.resolve_or_create("Cable Chest Press", "u1", &ResolveOptions::default())
            .await
            .unwrap();

        let outcome = svc
            .recommend_substitutes("Cable Chest Press", "u1", None, false)
            .await
            .unwrap();
        assert!(!outcome.recommendations.is_empty());
        assert!(outcome.recommendations.iter().all(|r| {
            r.candidate.entity.movement_pattern
                == crate::exercise::MovementPattern::HorizontalPush
        }));
    }

    #[tokio::test]
    async fn test_invalid_name_rejected() {
        let (svc, _dir) = service();
        let err = svc
            .resolve_or_create("", "u1", &ResolveOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidExerciseName(_)));
    }
}
