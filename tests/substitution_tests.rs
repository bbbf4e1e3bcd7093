//! Substitute recommendation integration tests

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use voicefit_resolver::constants::{
    DEFAULT_FUZZY_THRESHOLD, DEFAULT_SUBSTITUTE_COUNT, FLAG_AI_RERANK, FLAG_CONTEXT_AWARE,
    SEMANTIC_ACCEPT_THRESHOLD,
};
use voicefit_resolver::context::{
    ContextStore, InMemoryContextStore, Injury, InjurySeverity, UserContext,
};
use voicefit_resolver::embeddings::{Embedder, HashEmbedder};
use voicefit_resolver::exercise::EntityStore;
use voicefit_resolver::flags::{FeatureFlag, InMemoryFlagStore};
use voicefit_resolver::index::IdentityIndex;
use voicefit_resolver::matching::MatchOptions;
use voicefit_resolver::reranker::{RerankEntry, Reranker};
use voicefit_resolver::seed;
use voicefit_resolver::service::ExerciseService;
use voicefit_resolver::substitution::ScoredCandidate;

fn build_service(
    context_store: Arc<InMemoryContextStore>,
    flags: Arc<InMemoryFlagStore>,
    reranker: Option<Arc<dyn Reranker>>,
    rerank_timeout: Duration,
) -> (ExerciseService, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let store = Arc::new(EntityStore::open(dir.path()).expect("open store"));
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::default());
    seed::seed_store(&store, embedder.as_ref()).expect("seed");
    let index = Arc::new(IdentityIndex::new());
    index.rebuild(&store.all());
    let table = seed::seed_substitutions(store.clone());

    let svc = ExerciseService::with_components(
        store,
        index,
        embedder,
        table,
        context_store as Arc<dyn ContextStore>,
        flags,
        reranker,
        MatchOptions {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            semantic_threshold: SEMANTIC_ACCEPT_THRESHOLD,
        },
        rerank_timeout,
    );
    (svc, dir)
}

fn context_aware_flags() -> Arc<InMemoryFlagStore> {
    let flags = InMemoryFlagStore::new();
    flags.set_flag(FeatureFlag::full(FLAG_CONTEXT_AWARE));
    Arc::new(flags)
}

#[tokio::test]
async fn shoulder_injury_ranks_relief_candidates_first() {
    let context_store = Arc::new(InMemoryContextStore::new());
    context_store.add_injury(
        "u1",
        Injury {
            body_part: "shoulder".to_string(),
            severity: InjurySeverity::Moderate,
        },
    );
    let (svc, _dir) = build_service(
        context_store,
        context_aware_flags(),
        None,
        Duration::from_secs(1),
    );

    let outcome = svc
        .recommend_substitutes("Overhead Press", "u1", None, false)
        .await
        .unwrap();

    assert!(outcome.context_aware);
    assert_eq!(
        outcome.recommendations[0].candidate.entity.display_name,
        "Landmine Press"
    );
    assert!(outcome.recommendations[0]
        .candidate
        .why
        .iter()
        .any(|w| w.contains("shoulder")));
}

#[tokio::test]
async fn equipment_constraint_removes_unavailable_candidates() {
    let context_store = Arc::new(InMemoryContextStore::new());
    context_store.set_equipment("u1", ["dumbbell".to_string()]);
    let (svc, _dir) = build_service(
        context_store,
        context_aware_flags(),
        None,
        Duration::from_secs(1),
    );

    let outcome = svc
        .recommend_substitutes("Overhead Press", "u1", None, false)
        .await
        .unwrap();

    for rec in &outcome.recommendations {
        let equipment = &rec.candidate.entity.primary_equipment;
        assert!(
            equipment == "dumbbell" || equipment == "bodyweight",
            "candidate {} requires {}",
            rec.candidate.entity.display_name,
            equipment
        );
    }
    // Dumbbell option survives; landmine and machine do not
    assert!(outcome
        .recommendations
        .iter()
        .any(|r| r.candidate.entity.display_name == "Dumbbell Shoulder Press"));
}

#[tokio::test]
async fn unknown_equipment_keeps_every_candidate() {
    let (svc, _dir) = build_service(
        Arc::new(InMemoryContextStore::new()),
        context_aware_flags(),
        None,
        Duration::from_secs(1),
    );

    let outcome = svc
        .recommend_substitutes("Overhead Press", "anonymous", None, false)
        .await
        .unwrap();
    assert_eq!(outcome.recommendations.len(), 4);
}

#[tokio::test]
async fn context_flag_off_uses_base_scores() {
    let context_store = Arc::new(InMemoryContextStore::new());
    // Stored injury must be ignored when the flag is off
    context_store.add_injury(
        "u1",
        Injury {
            body_part: "shoulder".to_string(),
            severity: InjurySeverity::Severe,
        },
    );
    let flags = Arc::new(InMemoryFlagStore::new());
    let (svc, _dir) = build_service(context_store, flags, None, Duration::from_secs(1));

    let outcome = svc
        .recommend_substitutes("Overhead Press", "u1", None, false)
        .await
        .unwrap();

    assert!(!outcome.context_aware);
    // Highest base score leads when context plays no part
    assert_eq!(
        outcome.recommendations[0].candidate.entity.display_name,
        "Dumbbell Shoulder Press"
    );
}

#[tokio::test]
async fn request_body_part_counts_without_stored_context() {
    let (svc, _dir) = build_service(
        Arc::new(InMemoryContextStore::new()),
        context_aware_flags(),
        None,
        Duration::from_secs(1),
    );

    let outcome = svc
        .recommend_substitutes("Overhead Press", "u1", Some("shoulder"), false)
        .await
        .unwrap();
    assert_eq!(
        outcome.recommendations[0].candidate.entity.display_name,
        "Landmine Press"
    );
}

#[tokio::test]
async fn show_more_expands_candidate_list() {
    let (svc, _dir) = build_service(
        Arc::new(InMemoryContextStore::new()),
        context_aware_flags(),
        None,
        Duration::from_secs(1),
    );

    let short = svc
        .recommend_substitutes("Back Squat", "u1", None, false)
        .await
        .unwrap();
    let long = svc
        .recommend_substitutes("Back Squat", "u1", None, true)
        .await
        .unwrap();

    assert!(short.recommendations.len() <= DEFAULT_SUBSTITUTE_COUNT);
    assert!(long.recommendations.len() >= short.recommendations.len());
}

struct StallingReranker;

#[async_trait]
impl Reranker for StallingReranker {
    async fn rerank(
        &self,
        _source_name: &str,
        _candidates: &[ScoredCandidate],
        _context: &UserContext,
    ) -> Vec<RerankEntry> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Vec::new()
    }
}

#[tokio::test]
async fn rerank_timeout_falls_back_to_deterministic_order() {
    let flags = InMemoryFlagStore::new();
    flags.set_flag(FeatureFlag::full(FLAG_CONTEXT_AWARE));
    flags.set_flag(FeatureFlag::full(FLAG_AI_RERANK));
    let (svc, _dir) = build_service(
        Arc::new(InMemoryContextStore::new()),
        Arc::new(flags),
        Some(Arc::new(StallingReranker)),
        Duration::from_millis(50),
    );

    let start = std::time::Instant::now();
    let outcome = svc
        .recommend_substitutes("Overhead Press", "u1", None, false)
        .await
        .unwrap();

    assert!(!outcome.reranked);
    assert_eq!(outcome.recommendations.len(), 4);
    assert!(outcome
        .recommendations
        .iter()
        .all(|r| r.rerank_rationale.is_none()));
    assert!(
        start.elapsed() < Duration::from_secs(5),
        "timeout must bound the stall"
    );
    // Deterministic order preserved
    assert_eq!(
        outcome.recommendations[0].candidate.entity.display_name,
        "Dumbbell Shoulder Press"
    );
}

struct ReversingReranker;

#[async_trait]
impl Reranker for ReversingReranker {
    async fn rerank(
        &self,
        _source_name: &str,
        candidates: &[ScoredCandidate],
        _context: &UserContext,
    ) -> Vec<RerankEntry> {
        candidates
            .iter()
            .rev()
            .map(|c| RerankEntry {
                entity_id: c.entity.id,
                rationale: Some("model preference".to_string()),
            })
            .collect()
    }
}

#[tokio::test]
async fn premium_user_reranks_below_candidate_minimum() {
    let flags = InMemoryFlagStore::new();
    flags.set_flag(FeatureFlag::full(FLAG_CONTEXT_AWARE));
    flags.set_flag(FeatureFlag::partial(FLAG_AI_RERANK, 0.0, true));
    flags.set_premium("vip");
    let (svc, _dir) = build_service(
        Arc::new(InMemoryContextStore::new()),
        Arc::new(flags),
        Some(Arc::new(ReversingReranker)),
        Duration::from_secs(5),
    );

    // Dumbbell Flye has only two curated substitutes
    let outcome = svc
        .recommend_substitutes("Dumbbell Flye", "vip", None, false)
        .await
        .unwrap();
    assert_eq!(outcome.recommendations.len(), 2);
    assert!(outcome.reranked);
    assert!(outcome
        .recommendations
        .iter()
        .all(|r| r.rerank_rationale.is_some()));

    // Same list for a free user stays on the deterministic path
    let free = svc
        .recommend_substitutes("Dumbbell Flye", "free", None, false)
        .await
        .unwrap();
    assert_eq!(free.recommendations.len(), 2);
    assert!(!free.reranked);
}

#[tokio::test]
async fn rerank_reorders_without_changing_membership() {
    let flags = InMemoryFlagStore::new();
    flags.set_flag(FeatureFlag::full(FLAG_CONTEXT_AWARE));
    flags.set_flag(FeatureFlag::full(FLAG_AI_RERANK));
    let (svc, _dir) = build_service(
        Arc::new(InMemoryContextStore::new()),
        Arc::new(flags),
        Some(Arc::new(ReversingReranker)),
        Duration::from_secs(5),
    );

    let baseline = {
        let flags = InMemoryFlagStore::new();
        flags.set_flag(FeatureFlag::full(FLAG_CONTEXT_AWARE));
        let (plain, _d) = build_service(
            Arc::new(InMemoryContextStore::new()),
            Arc::new(flags),
            None,
            Duration::from_secs(5),
        );
        plain
            .recommend_substitutes("Overhead Press", "u1", None, false)
            .await
            .unwrap()
    };

    let outcome = svc
        .recommend_substitutes("Overhead Press", "u1", None, false)
        .await
        .unwrap();

    assert!(outcome.reranked);
    assert_eq!(
        outcome.recommendations.len(),
        baseline.recommendations.len()
    );

    let mut baseline_names: Vec<String> = baseline
        .recommendations
        .iter()
        .map(|r| r.candidate.entity.display_name.clone())
        .collect();
    let mut reranked_names: Vec<String> = outcome
        .recommendations
        .iter()
        .map(|r| r.candidate.entity.display_name.clone())
        .collect();
    assert_eq!(
        reranked_names,
        baseline_names.iter().cloned().rev().collect::<Vec<_>>()
    );
    baseline_names.sort();
    reranked_names.sort();
    assert_eq!(baseline_names, reranked_names);
    assert!(outcome
        .recommendations
        .iter()
        .all(|r| r.rerank_rationale.is_some()));
}
