//! Health and infrastructure handlers
//!
//! Kubernetes probes and the Prometheus scrape endpoint.

use axum::{extract::State, http::StatusCode, response::Json};

use super::router::AppState;
use crate::metrics;

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub exercises_count: usize,
}

/// Main health check endpoint
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        exercises_count: state.store().len(),
    })
}

/// Liveness probe; succeeds whenever the process is reachable
pub async fn health_live() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "alive",
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
}

/// Readiness probe; not ready until the catalog is loaded
pub async fn health_ready(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let count = state.store().len();
    let status = if count > 0 {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": if count > 0 { "ready" } else { "not_ready" },
            "version": env!("CARGO_PKG_VERSION"),
            "exercises_count": count,
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
}

/// Prometheus scrape endpoint
pub async fn metrics_endpoint() -> String {
    metrics::gather_metrics()
}
