//! Resolution cascade integration tests against a seeded catalog

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use voicefit_resolver::constants::{DEFAULT_FUZZY_THRESHOLD, SEMANTIC_ACCEPT_THRESHOLD};
use voicefit_resolver::context::InMemoryContextStore;
use voicefit_resolver::embeddings::{Embedder, HashEmbedder};
use voicefit_resolver::exercise::EntityStore;
use voicefit_resolver::flags::InMemoryFlagStore;
use voicefit_resolver::index::IdentityIndex;
use voicefit_resolver::matching::{MatchOptions, MatchStageKind};
use voicefit_resolver::seed;
use voicefit_resolver::service::{ExerciseService, ResolveOptions};

fn seeded_service() -> (ExerciseService, TempDir) {
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
        Arc::new(InMemoryContextStore::new()),
        Arc::new(InMemoryFlagStore::new()),
        None,
        MatchOptions {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            semantic_threshold: SEMANTIC_ACCEPT_THRESHOLD,
        },
        Duration::from_secs(1),
    );
    (svc, dir)
}

#[tokio::test]
async fn exact_match_on_canonical_name() {
    let (svc, _dir) = seeded_service();
    let outcome = svc
        .resolve_or_create("Overhead Press", "u1", &ResolveOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.stage, MatchStageKind::Exact);
    assert!(!outcome.created);
}

#[tokio::test]
async fn exact_match_through_synonym_expansion() {
    let (svc, _dir) = seeded_service();
    for phrase in ["OHP", "military press", "overhead   press"] {
        let outcome = svc
            .resolve_or_create(phrase, "u1", &ResolveOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome.stage, MatchStageKind::Exact, "phrase: {phrase}");
        assert_eq!(
            outcome.entity.unwrap().display_name,
            "Overhead Press",
            "phrase: {phrase}"
        );
    }
}

#[tokio::test]
async fn fuzzy_match_db_flat_bench() {
    let (svc, _dir) = seeded_service();
    let outcome = svc
        .resolve_or_create("DB Flat Bench", "u1", &ResolveOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.stage, MatchStageKind::Fuzzy);
    let score = outcome.score.unwrap();
    assert!(score >= 0.80, "score was {score}");
    assert_eq!(outcome.entity.unwrap().display_name, "Dumbbell Bench Press");
}

#[tokio::test]
async fn resolution_is_idempotent() {
    let (svc, _dir) = seeded_service();
    let first = svc
        .resolve_or_create("DB Flat Bench", "u1", &ResolveOptions::default())
        .await
        .unwrap();
    let second = svc
        .resolve_or_create("DB Flat Bench", "u2", &ResolveOptions::default())
        .await
        .unwrap();
    assert_eq!(
        first.entity.unwrap().id,
        second.entity.unwrap().id
    );
    assert_eq!(first.stage, second.stage);
}

#[tokio::test]
async fn unseen_name_creates_entity_with_inferred_metadata() {
    let (svc, _dir) = seeded_service();
    let outcome = svc
        .resolve_or_create("Cable Chest Flye", "u1", &ResolveOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.stage, MatchStageKind::Created);
    assert!(outcome.created);
    let entity = outcome.entity.unwrap();
    assert_eq!(entity.primary_equipment, "cable");
    assert_eq!(entity.movement_pattern.category(), "push");
}

#[tokio::test]
async fn auto_create_disabled_reports_no_match() {
    let (svc, _dir) = seeded_service();
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
async fn concurrent_creation_yields_single_entity() {
    let (svc, _dir) = seeded_service();
    let svc = Arc::new(svc);
    let before = svc.store().len();

    let mut handles = Vec::new();
    for i in 0..8 {
        let svc = svc.clone();
        handles.push(tokio::spawn(async move {
            svc.resolve_or_create(
                "Zombie Squat",
                &format!("user-{i}"),
                &ResolveOptions::default(),
            )
            .await
            .unwrap()
        }));
    }

    let mut ids = Vec::new();
    let mut creations = 0;
    for handle in handles {
        let outcome = handle.await.unwrap();
        if outcome.created {
            creations += 1;
        }
        ids.push(outcome.entity.unwrap().id);
    }

    assert!(ids.windows(2).all(|w| w[0] == w[1]), "ids diverged: {ids:?}");
    assert_eq!(creations, 1, "exactly one request should win the race");
    assert_eq!(svc.store().len(), before + 1);
}

#[tokio::test]
async fn stricter_threshold_rejects_borderline_fuzzy() {
    let (svc, _dir) = seeded_service();
    let outcome = svc
        .resolve_or_create(
            "DB Flat Bench",
            "u1",
            &ResolveOptions {
                auto_create: false,
                fuzzy_threshold: Some(0.97),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    // 0.97 is above the blended score for this phrase; the semantic stage
    // does not reach its own threshold either
    assert!(!outcome.success());
}

#[tokio::test]
async fn raising_threshold_never_adds_fuzzy_matches() {
    let (svc, _dir) = seeded_service();
    let queries = ["DB Flat Bench", "goblet sqat"];

    let mut previous = usize::MAX;
    for threshold in [0.70, 0.80, 0.95] {
        let mut fuzzy_hits = 0;
        for query in queries {
            let outcome = svc
                .resolve_or_create(
                    query,
                    "u1",
                    &ResolveOptions {
                        auto_create: false,
                        fuzzy_threshold: Some(threshold),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            if outcome.stage == MatchStageKind::Fuzzy {
                fuzzy_hits += 1;
            }
        }
        assert!(
            fuzzy_hits <= previous,
            "threshold {threshold} matched {fuzzy_hits} queries, previous matched {previous}"
        );
        previous = fuzzy_hits;
    }
    assert_eq!(previous, 0, "0.95 should reject every query");
}

#[tokio::test]
async fn created_entity_survives_reopen() {
    let dir = TempDir::new().expect("temp dir");
    let created_id = {
        let store = Arc::new(EntityStore::open(dir.path()).expect("open store"));
        let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::default());
        seed::seed_store(&store, embedder.as_ref()).expect("seed");
        let index = Arc::new(IdentityIndex::new());
        index.rebuild(&store.all());
        let table = seed::seed_substitutions(store.clone());
        let svc = ExerciseService::with_components(
            store.clone(),
            index,
            embedder,
            table,
            Arc::new(InMemoryContextStore::new()),
            Arc::new(InMemoryFlagStore::new()),
            None,
            MatchOptions {
                fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
                semantic_threshold: SEMANTIC_ACCEPT_THRESHOLD,
            },
            Duration::from_secs(1),
        );
        let outcome = svc
            .resolve_or_create("Sandbag Carry", "u1", &ResolveOptions::default())
            .await
            .unwrap();
        svc.flush().unwrap();
        outcome.entity.unwrap().id
    };

    let reopened = EntityStore::open(dir.path()).expect("reopen store");
    let entity = reopened.get(created_id).expect("entity persisted");
    assert_eq!(entity.display_name, "Sandbag Carry");
}
