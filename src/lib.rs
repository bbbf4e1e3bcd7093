//! VoiceFit resolver: exercise identity resolution and context-aware
//! substitution for voice-logged workouts.
//!
//! A spoken exercise name passes through normalization, synonym
//! expansion, and a short-circuiting match cascade (exact, fuzzy,
//! semantic); anything still unresolved can become a new entity.
//! Substitute recommendations filter a curated candidate table against
//! the user's equipment, injuries, and program, with an optional
//! AI rerank on top.

pub mod auth;
pub mod config;
pub mod constants;
pub mod context;
pub mod creator;
pub mod embeddings;
pub mod errors;
pub mod exercise;
pub mod flags;
pub mod handlers;
pub mod index;
pub mod matching;
pub mod metrics;
pub mod middleware;
pub mod normalize;
pub mod reranker;
pub mod seed;
pub mod service;
pub mod similarity;
pub mod substitution;
pub mod synonyms;
pub mod tracing_setup;
pub mod validation;

pub use config::ServerConfig;
pub use errors::{AppError, Result};
pub use service::{ExerciseService, ResolveOptions};
