//! Match cascade: exact, fuzzy, semantic, create
//!
//! Each stage is a pure decision point behind a common trait, tried in
//! order; the first acceptance short-circuits the rest. Adding a stage
//! (a phonetic-key pass, say) is a pure addition to the stage list.
//!
//! Fuzzy measure: an even blend of Jaro-Winkler similarity and a
//! token-overlap Dice coefficient over normalized strings. Jaro-Winkler
//! carries typo tolerance at the character level; Dice carries word-level
//! evidence and keeps long names that merely share a prefix ("dumbbell
//! incline ...") from outscoring the true target. Ties break toward the
//! lexicographically smaller normalized name so results are reproducible.

use anyhow::Result;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::embeddings::Embedder;
use crate::exercise::EntityStore;
use crate::index::IdentityIndex;
use crate::similarity::cosine_similarity;

/// Which stage resolved (or declined) a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStageKind {
    Exact,
    Fuzzy,
    Semantic,
    Created,
    None,
}

impl MatchStageKind {
    /// Stable label used in responses and metrics
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Fuzzy => "fuzzy",
            Self::Semantic => "semantic",
            Self::Created => "created",
            Self::None => "none",
        }
    }
}

impl fmt::Display for MatchStageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_label())
    }
}

/// A query prepared for matching: normalized form plus synonym expansions
#[derive(Debug, Clone)]
pub struct MatchQuery {
    pub raw: String,
    pub normalized: String,
    pub variants: BTreeSet<String>,
}

/// Per-request matching options
#[derive(Debug, Clone)]
pub struct MatchOptions {
    pub fuzzy_threshold: f32,
    pub semantic_threshold: f32,
}

/// Outcome of a single stage
#[derive(Debug, Clone)]
pub enum StageOutcome {
    Matched {
        id: Uuid,
        matched_name: String,
        score: f32,
    },
    Declined,
}

/// A single decision point in the cascade
pub trait MatchStage: Send + Sync {
    fn kind(&self) -> MatchStageKind;
    fn attempt(&self, query: &MatchQuery, opts: &MatchOptions) -> Result<StageOutcome>;
}

/// Result of running the cascade (without the create stage)
#[derive(Debug, Clone)]
pub struct CascadeMatch {
    pub id: Uuid,
    pub matched_name: String,
    pub stage: MatchStageKind,
    pub score: f32,
}

/// Ordered stage list with strict short-circuit semantics
pub struct MatchCascade {
    stages: Vec<Box<dyn MatchStage>>,
}

impl MatchCascade {
    pub fn new(store: Arc<EntityStore>, index: Arc<IdentityIndex>, embedder: Arc<dyn Embedder>) -> Self {
        let stages: Vec<Box<dyn MatchStage>> = vec![
            Box::new(ExactStage {
                store: store.clone(),
                index: index.clone(),
            }),
            Box::new(FuzzyStage {
                store: store.clone(),
                index,
            }),
            Box::new(SemanticStage { store, embedder }),
        ];
        Self { stages }
    }

    /// Run stages in order; later stages never execute once one accepts
    pub fn resolve(&self, query: &MatchQuery, opts: &MatchOptions) -> Result<Option<CascadeMatch>> {
        for stage in &self.stages {
            match stage.attempt(query, opts)? {
                StageOutcome::Matched {
                    id,
                    matched_name,
                    score,
                } => {
                    return Ok(Some(CascadeMatch {
                        id,
                        matched_name,
                        stage: stage.kind(),
                        score,
                    }));
                }
                StageOutcome::Declined => continue,
            }
        }
        Ok(None)
    }
}

// =============================================================================
// Stage: exact
// =============================================================================

struct ExactStage {
    store: Arc<EntityStore>,
    index: Arc<IdentityIndex>,
}

impl MatchStage for ExactStage {
    fn kind(&self) -> MatchStageKind {
        MatchStageKind::Exact
    }

    fn attempt(&self, query: &MatchQuery, _opts: &MatchOptions) -> Result<StageOutcome> {
        // Normalized form first, then variants in sorted order: the hit is
        // deterministic even when multiple variants are indexed.
        let candidates = std::iter::once(&query.normalized).chain(
            query
                .variants
                .iter()
                .filter(|v| **v != query.normalized),
        );

        for variant in candidates {
            if let Some(id) = self.index.lookup(variant) {
                if let Some(entity) = self.store.get(id) {
                    return Ok(StageOutcome::Matched {
                        id,
                        matched_name: entity.display_name,
                        score: 1.0,
                    });
                }
            }
        }

        Ok(StageOutcome::Declined)
    }
}

// =============================================================================
// Stage: fuzzy
// =============================================================================

struct FuzzyStage {
    store: Arc<EntityStore>,
    index: Arc<IdentityIndex>,
}

impl MatchStage for FuzzyStage {
    fn kind(&self) -> MatchStageKind {
        MatchStageKind::Fuzzy
    }

    fn attempt(&self, query: &MatchQuery, opts: &MatchOptions) -> Result<StageOutcome> {
        let mut best: Option<(OrderedFloat<f32>, String, Uuid)> = None;

        for (key, id) in self.index.snapshot() {
            let mut score = name_similarity(&query.normalized, &key);
            for variant in &query.variants {
                if variant != &query.normalized {
                    score = score.max(name_similarity(variant, &key));
                }
            }

            let candidate = (OrderedFloat(score), key, id);
            best = match best {
                None => Some(candidate),
                Some(current) => {
                    // Higher score wins; on exact ties prefer the
                    // lexicographically smaller key.
                    if candidate.0 > current.0 || (candidate.0 == current.0 && candidate.1 < current.1)
                    {
                        Some(candidate)
                    } else {
                        Some(current)
                    }
                }
            };
        }

        match best {
            Some((score, _key, id)) if score.0 >= opts.fuzzy_threshold => {
                let Some(entity) = self.store.get(id) else {
                    return Ok(StageOutcome::Declined);
                };
                Ok(StageOutcome::Matched {
                    id,
                    matched_name: entity.display_name,
                    score: score.0,
                })
            }
            _ => Ok(StageOutcome::Declined),
        }
    }
}

/// String similarity: even blend of Jaro-Winkler and token-overlap Dice
pub fn name_similarity(a: &str, b: &str) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let jw = strsim::jaro_winkler(a, b) as f32;

    let tokens_a: HashSet<&str> = a.split_whitespace().collect();
    let tokens_b: HashSet<&str> = b.split_whitespace().collect();
    let overlap = tokens_a.intersection(&tokens_b).count();
    let dice = if tokens_a.is_empty() || tokens_b.is_empty() {
        0.0
    } else {
        (2.0 * overlap as f32) / (tokens_a.len() + tokens_b.len()) as f32
    };

    0.5 * jw + 0.5 * dice
}

// =============================================================================
// Stage: semantic
// =============================================================================

struct SemanticStage {
    store: Arc<EntityStore>,
    embedder: Arc<dyn Embedder>,
}

impl MatchStage for SemanticStage {
    fn kind(&self) -> MatchStageKind {
        MatchStageKind::Semantic
    }

    fn attempt(&self, query: &MatchQuery, opts: &MatchOptions) -> Result<StageOutcome> {
        let query_vec = self.embedder.encode(&query.normalized)?;
        if query_vec.iter().all(|&x| x == 0.0) {
            return Ok(StageOutcome::Declined);
        }

        let mut best: Option<(OrderedFloat<f32>, String, Uuid)> = None;

        for entity in self.store.all() {
            let Some(embedding) = &entity.embedding else {
                continue;
            };
            let score = cosine_similarity(&query_vec, embedding);
            let candidate = (OrderedFloat(score), entity.normalized_name.clone(), entity.id);

            best = match best {
                None => Some(candidate),
                Some(current) => {
                    if candidate.0 > current.0 || (candidate.0 == current.0 && candidate.1 < current.1)
                    {
                        Some(candidate)
                    } else {
                        Some(current)
                    }
                }
            };
        }

        match best {
            Some((score, _name, id)) if score.0 >= opts.semantic_threshold => {
                let Some(entity) = self.store.get(id) else {
                    return Ok(StageOutcome::Declined);
                };
                Ok(StageOutcome::Matched {
                    id,
                    matched_name: entity.display_name,
                    score: score.0,
                })
            }
            _ => Ok(StageOutcome::Declined),
        }
    }
}
