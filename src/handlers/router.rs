//! Router configuration - centralized route definitions
//!
//! Routes are split into public (no auth) and protected (auth required).

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::{flags, health, resolve, substitute};
use crate::service::ExerciseService;

/// Application state type alias
pub type AppState = Arc<ExerciseService>;

/// Public routes: health checks (Kubernetes probes) and metrics
/// (Prometheus scraping) must always be reachable.
pub fn build_public_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::health_live))
        .route("/health/ready", get(health::health_ready))
        .route("/metrics", get(health::metrics_endpoint))
        .with_state(state)
}

/// Protected routes requiring an API key
pub fn build_protected_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/exercises/resolve", post(resolve::resolve_exercise))
        .route(
            "/api/exercises/substitutes",
            post(substitute::recommend_substitutes),
        )
        .route("/api/flags/{name}", get(flags::get_flag))
        .layer(axum::middleware::from_fn(crate::auth::auth_middleware))
        .with_state(state)
}
