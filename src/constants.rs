//! Documented constants for the resolution and substitution pipeline
//!
//! All tunable parameters live here with justification for their values.
//! Centralizing constants prevents magic numbers and makes tuning easier.

// =============================================================================
// MATCH CASCADE THRESHOLDS
// =============================================================================

/// Default acceptance threshold for the fuzzy (string-similarity) stage
///
/// A candidate must score at least this against the query (or one of its
/// synonym expansions) for the fuzzy stage to accept it. Callers may
/// override per request within [0, 1].
///
/// Justification:
/// - 0.80 admits abbreviation expansions ("db flat bench" vs
///   "dumbbell bench press") while rejecting cross-movement confusions
///   ("cable chest flye" vs "dumbbell flye" scores ~0.4-0.6).
/// - Below ~0.75 the stage starts conflating distinct movements that share
///   an equipment prefix.
pub const DEFAULT_FUZZY_THRESHOLD: f32 = 0.80;

/// Acceptance threshold for the semantic (embedding-similarity) stage
///
/// Deliberately stricter than the fuzzy threshold: the semantic stage only
/// runs after string similarity has already declined, so a loose threshold
/// here would re-admit exactly the confusions fuzzy rejected.
pub const SEMANTIC_ACCEPT_THRESHOLD: f32 = 0.86;

/// Embedding dimension used throughout the service
///
/// Matches the MiniLM-class sentence-embedding profile so a networked
/// embedder can be swapped behind the `Embedder` trait without reindexing.
pub const EMBEDDING_DIM: usize = 384;

// =============================================================================
// SYNONYM EXPANSION
// =============================================================================

/// Maximum phrasings accepted from the generative synonym service
///
/// The generative path is advisory; capping it keeps the index scan bounded
/// and prevents a chatty model from flooding the synonym set.
pub const MAX_GENERATIVE_SYNONYMS: usize = 10;

// =============================================================================
// CANDIDATE SCORING WEIGHTS
//
// Soft signals adjust ranking but never exclude a candidate. Weights are
// sized so that injury relief dominates: recommending an exercise that
// loads an injured joint is the costliest mistake the ranker can make.
// =============================================================================

/// Boost for candidates tagged as reducing stress on an injured body part
///
/// Large enough that a 0.85-base-similarity joint-friendly candidate
/// outranks a 0.95 candidate that loads the injury.
pub const INJURY_RELIEF_WEIGHT: f32 = 0.15;

/// Boost for candidates whose difficulty matches the user's experience level
pub const DIFFICULTY_MATCH_WEIGHT: f32 = 0.05;

/// Boost for candidates already present in the user's current program
///
/// Continuity keeps substitutions inside movements the user already
/// performs, which matters more than a marginal similarity edge.
pub const PROGRAM_CONTINUITY_WEIGHT: f32 = 0.08;

// =============================================================================
// SUBSTITUTION RESULT SHAPING
// =============================================================================

/// Candidates returned by default
pub const DEFAULT_SUBSTITUTE_COUNT: usize = 5;

/// Candidates returned when the caller asks for the expanded list
pub const EXPANDED_SUBSTITUTE_COUNT: usize = 10;

/// Minimum filtered-candidate count before the AI reranker is worth a call
///
/// With two or fewer candidates the deterministic order already is the
/// answer; a multi-second LLM round trip cannot change it.
pub const RERANK_MIN_CANDIDATES: usize = 3;

// =============================================================================
// EXTERNAL SERVICE BOUNDS
// =============================================================================

/// Hard timeout for the generative reranker call (seconds)
///
/// The reranker races a fallback that is always ready; 10s is the ceiling
/// the mobile client tolerates before the substitution sheet feels broken.
pub const RERANK_TIMEOUT_SECS: u64 = 10;

/// Per-lookup timeout for context gathering (milliseconds)
///
/// The four context lookups run concurrently, so total gather latency is
/// bounded by the slowest lookup, which this caps. A missed lookup degrades
/// that field to Unknown instead of failing the request.
pub const CONTEXT_LOOKUP_TIMEOUT_MS: u64 = 1_500;

/// Timeout for the advisory generative-synonym call (milliseconds)
pub const GENERATIVE_SYNONYM_TIMEOUT_MS: u64 = 2_500;

// =============================================================================
// FEATURE FLAGS
// =============================================================================

/// Time-to-live for cached feature-flag values (seconds)
///
/// Bounds staleness after an operator changes a rollout percentage.
/// 5 minutes matches the ops expectation that a flag flip is visible
/// "within a few minutes" without hammering the flag store per request.
pub const FLAG_CACHE_TTL_SECS: u64 = 300;

/// Flag gating the context-aware substitution path
pub const FLAG_CONTEXT_AWARE: &str = "context_aware_substitutions";

/// Flag gating the generative reranker
pub const FLAG_AI_RERANK: &str = "ai_rerank";

/// Flag gating generative synonym augmentation
pub const FLAG_GENERATIVE_SYNONYMS: &str = "generative_synonyms";

// =============================================================================
// PHONETIC KEYS
// =============================================================================

/// Fixed length of the consonant-skeleton phonetic key
pub const PHONETIC_KEY_LEN: usize = 6;
